use clap::Parser;

fn main() {
    let cli = fcc_drv::Cli::parse();
    match fcc_drv::run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("fcc: {:#}", err);
            std::process::exit(1);
        }
    }
}
