use ttylink::{boot, cli};

fn main() {
    let matches = cli::parse_args();
    boot::init_logger(matches.get_one::<String>("log-file").map(String::as_str));

    if let Err(err) = cli::run(&matches) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
