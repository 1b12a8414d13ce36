use std::error::Error;
use std::fs;
use std::path::Path;

use disent_ada::to_canonical_json_bytes;
use serde::Serialize;

pub mod demo;
pub mod frameworks;
pub mod intercept;
pub mod version;

pub(crate) fn print_canonical<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    let json = to_canonical_json_bytes(value).map_err(|err| Box::new(err) as Box<dyn Error>)?;
    println!("{}", String::from_utf8(json)?);
    Ok(())
}

pub(crate) fn write_json<P: AsRef<Path>, T: Serialize>(
    path: P,
    value: &T,
) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}
