fn main() -> Result<(), Box<dyn std::error::Error>> {
    chatpdf::cli::main()
}
