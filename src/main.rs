fn main() -> miette::Result<()> {
    argot::cli::run()
}
