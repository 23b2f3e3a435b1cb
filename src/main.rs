fn main() -> anyhow::Result<()> {
    tasks_tui::cli::run()
}
