fn main() -> anyhow::Result<()> {
    bench_aggregate::cli::run()
}
