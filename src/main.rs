use anyhow::Result;

fn main() -> Result<()> {
    datadock::run()
}
