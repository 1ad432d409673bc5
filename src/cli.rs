//! Purpose: Argument grammar and dispatch for the `kim-api-simulator-model` utility.
//! Exports: `run`, plus the exit-code constants.
//! Role: Library half of the binary; `main.rs` supplies the process streams and model loader.
//! Invariants: Exit codes: -1 bad usage, -2 missing name/data selector, 1 model creation
//! Invariants: failure, 7 invalid parameter file index, 8 file read failure.
//! Invariants: Requested data goes to `out`; the usage text goes to `err`.
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::Path;

use clap::{Parser, error::ErrorKind as ClapErrorKind};

use crate::api::{Error, PROJECT_VERSION, SimulatorModel};

pub const USAGE_ERROR: i32 = -1;
pub const SELECTOR_ERROR: i32 = -2;
pub const CREATE_ERROR: i32 = 1;
pub const INDEX_ERROR: i32 = 7;
pub const FILE_ERROR: i32 = 8;

const PROGRAM: &str = "kim-api-simulator-model";

#[derive(Parser, Debug)]
#[command(
    name = "kim-api-simulator-model",
    disable_version_flag = true,
    about = "Print simulator model metadata and parameter files"
)]
struct Cli {
    #[arg(long = "version", help = "Print the kim-api version")]
    version: bool,
    #[arg(value_name = "SIMULATOR_MODEL_NAME")]
    name: Option<String>,
    #[arg(value_name = "SELECTOR", help = "number-of-parameter-files, smspec-file or a one-based index")]
    selector: Option<String>,
    #[arg(value_name = "FORMAT", help = "data or name")]
    format: Option<String>,
    #[arg(hide = true, num_args = 0.., allow_hyphen_values = true)]
    extra: Vec<String>,
}

/// Run one invocation; `args` includes the program name. Returns the exit code.
pub fn run<I, T, F>(args: I, create: F, out: &mut dyn Write, err: &mut dyn Write) -> io::Result<i32>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    F: FnOnce(&str) -> Result<SimulatorModel, Error>,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(clap_err) if clap_err.kind() == ClapErrorKind::DisplayHelp => {
            write!(out, "{}", clap_err.render())?;
            return Ok(0);
        }
        Err(_) => return usage(err, USAGE_ERROR),
    };
    if !cli.extra.is_empty() {
        return usage(err, USAGE_ERROR);
    }
    if cli.version {
        if cli.name.is_some() {
            return usage(err, USAGE_ERROR);
        }
        writeln!(out, "{PROJECT_VERSION}")?;
        return Ok(0);
    }
    let Some(name) = cli.name else {
        return usage(err, USAGE_ERROR);
    };

    let model = match create(&name) {
        Ok(model) => model,
        Err(create_err) => {
            tracing::debug!("create failed: {create_err}");
            writeln!(out, "* Error: Could not create object for name: '{name}'")?;
            return Ok(CREATE_ERROR);
        }
    };

    let Some(selector) = cli.selector else {
        write!(out, "SIMULATOR_MODEL")?;
        out.flush()?;
        return Ok(0);
    };
    if selector == "number-of-parameter-files" {
        writeln!(out, "{}", model.number_of_parameter_files())?;
        return Ok(0);
    }
    let Some(format) = cli.format else {
        return usage(err, SELECTOR_ERROR);
    };

    let (file_name, what) = if selector == "smspec-file" {
        (model.specification_file_name().to_string(), "smspec")
    } else {
        let index = leading_integer(&selector);
        if index < 1 || index > model.number_of_parameter_files() as i64 {
            writeln!(out, "* Error: invalid index provided.")?;
            return Ok(INDEX_ERROR);
        }
        match model.parameter_file_basename(index as usize - 1) {
            Ok(basename) => (basename.to_string(), "parameter"),
            Err(_) => {
                writeln!(out, "* Error: unable to get parameter file name.")?;
                return Ok(FILE_ERROR);
            }
        }
    };
    print_file(out, model.parameter_file_directory_name(), &file_name, what, &format)
}

/// Value of the leading decimal digits (after optional space and sign); 0 when there are none.
fn leading_integer(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = rest
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(rest.len());
    let value = rest[..end].parse::<i64>().unwrap_or(0);
    if negative { -value } else { value }
}

fn print_file(
    out: &mut dyn Write,
    dir: &Path,
    file_name: &str,
    what: &str,
    format: &str,
) -> io::Result<i32> {
    let data = match std::fs::read(dir.join(file_name)) {
        Ok(data) => data,
        Err(read_err) => {
            tracing::debug!("read failed: {read_err}");
            writeln!(out, "* Error: unable to open {what} file.")?;
            return Ok(FILE_ERROR);
        }
    };
    match format {
        "name" => writeln!(out, "{file_name}")?,
        "data" => out.write_all(&data)?,
        _ => {}
    }
    out.flush()?;
    Ok(0)
}

fn usage(err: &mut dyn Write, exit_code: i32) -> io::Result<i32> {
    writeln!(err, "Usage:")?;
    writeln!(err, "  {PROGRAM} --version")?;
    writeln!(err, "  {PROGRAM} <simulator-model-name>")?;
    writeln!(err, "  {PROGRAM} <simulator-model-name> number-of-parameter-files")?;
    writeln!(err, "  {PROGRAM} <simulator-model-name> <one-based-index> (data | name)")?;
    writeln!(err, "  {PROGRAM} <simulator-model-name> smspec-file (data | name)")?;
    Ok(exit_code)
}

#[cfg(test)]
mod tests {
    use super::leading_integer;

    #[test]
    fn index_uses_leading_digits_only() {
        assert_eq!(leading_integer("2"), 2);
        assert_eq!(leading_integer("1abc"), 1);
        assert_eq!(leading_integer("  3"), 3);
        assert_eq!(leading_integer("-1"), -1);
        assert_eq!(leading_integer("abc"), 0);
        assert_eq!(leading_integer(""), 0);
    }
}
