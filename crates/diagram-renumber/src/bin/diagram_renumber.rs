fn main() -> anyhow::Result<()> {
    diagram_renumber::cli::run()
}
