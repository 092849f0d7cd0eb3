fn main() -> anyhow::Result<()> {
    pd_cli::run()
}
