use anyhow::Result;

pub fn run() -> Result<()> {
    println!("decree {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
