use std::fs;
use std::io::Read;

use lightws_frame::decode;

use crate::cmd::DecodeArgs;
use crate::exit::{decode_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input = match &args.file {
        Some(path) => fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|err| io_error("failed reading stdin", err))?;
            buf
        }
    };

    let frame = if args.hex {
        let text = std::str::from_utf8(&input)
            .map_err(|_| CliError::new(DATA_INVALID, "hex input is not valid UTF-8"))?;
        from_hex(text)?
    } else {
        input
    };

    let message = decode(&frame).map_err(|err| decode_error("decode failed", err))?;
    print_message(&message, frame.len(), None, format);
    Ok(SUCCESS)
}

/// Parse hex text, ignoring ASCII whitespace.
pub fn from_hex(text: &str) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = text
        .bytes()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::new(
            DATA_INVALID,
            "hex input has an odd number of digits",
        ));
    }

    digits
        .chunks_exact(2)
        .map(|pair| match (hex_digit(pair[0]), hex_digit(pair[1])) {
            (Some(high), Some(low)) => Ok((high << 4) | low),
            _ => Err(CliError::new(
                DATA_INVALID,
                format!("invalid hex digits: {}", String::from_utf8_lossy(pair)),
            )),
        })
        .collect()
}

fn hex_digit(byte: u8) -> Option<u8> {
    char::from(byte).to_digit(16).map(|digit| digit as u8)
}
