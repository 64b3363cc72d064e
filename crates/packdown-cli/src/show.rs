use std::fs;

use eyre::{Result, WrapErr};

use crate::cli::ShowArgs;

pub fn run_show(args: &ShowArgs) -> Result<()> {
    let contents = fs::read_to_string(&args.plan_file)
        .wrap_err_with(|| format!("reading plan file {}", args.plan_file.display()))?;
    print!("{}", contents);
    Ok(())
}
