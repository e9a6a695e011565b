use lightws_frame::encode;

use crate::cmd::EncodeArgs;
use crate::exit::{encode_error, CliResult, SUCCESS};
use crate::output::print_raw;

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let payload = args.payload.resolve()?;
    let frame =
        encode(&args.event, payload.as_ref()).map_err(|err| encode_error("encode failed", err))?;
    tracing::debug!(event = %args.event, size = frame.len(), "encoded frame");

    if args.hex {
        println!("{}", to_hex(&frame));
    } else {
        print_raw(&frame);
    }
    Ok(SUCCESS)
}

pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_lowercase_and_padded() {
        assert_eq!(to_hex(&[0x00, 0x0a, 0xff]), "000aff");
        assert_eq!(to_hex(&[]), "");
    }
}
