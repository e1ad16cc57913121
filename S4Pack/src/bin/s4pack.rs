fn main() -> anyhow::Result<()> {
    s4pack::cli::run_cli()
}
