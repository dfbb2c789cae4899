fn main() -> anyhow::Result<()> {
    plugbench::run()
}
