fn main() -> anyhow::Result<()> {
    print!("{}", mcp_operator::crd_yaml()?);
    Ok(())
}
