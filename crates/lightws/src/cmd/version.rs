use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("lightws {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: lightws");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("LIGHTWS_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "features: socket={}, websocket={}, cli=true",
        cfg!(feature = "socket"),
        cfg!(feature = "websocket")
    );
    println!(
        "frame: header_overhead={} no_payload=0x{:08x}",
        lightws_frame::HEADER_OVERHEAD,
        lightws_frame::NO_PAYLOAD
    );

    Ok(SUCCESS)
}
