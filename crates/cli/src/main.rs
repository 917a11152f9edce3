fn main() -> anyhow::Result<()> {
    lynkui_cli::run()
}
