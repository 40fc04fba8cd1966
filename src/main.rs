fn main() -> anyhow::Result<()> {
    dentrack_lib::run()
}
