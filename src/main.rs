use clap::{App, Arg};
use env_logger::Builder;
use log::{debug, info, LevelFilter};

use routerd::config::RouterConfig;
use routerd::handler::{serve, RouterError};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), RouterError> {
    let matches = App::new("routerd")
        .version("0.1")
        .about("BGP-like route exchange and forwarding engine")
        .arg(
            Arg::with_name("asn")
                .help("Autonomous system number for this router")
                .index(1)
                .required(true),
        )
        .arg(
            Arg::with_name("neighbors")
                .help("Neighbor links as <address>-<cust|peer|prov>")
                .index(2)
                .multiple(true)
                .required(true),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .takes_value(true)
                .help("TCP port the neighbor links listen on"),
        )
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .help("Sets the level of logging verbosity"),
        )
        .get_matches();

    let (routerd_level, other_level) = match matches.occurrences_of("v") {
        0 => (LevelFilter::Info, LevelFilter::Warn),
        1 => (LevelFilter::Debug, LevelFilter::Warn),
        2 => (LevelFilter::Trace, LevelFilter::Warn),
        _ => (LevelFilter::Trace, LevelFilter::Trace),
    };
    Builder::new()
        .filter(Some("routerd"), routerd_level)
        .filter(None, other_level)
        .init();
    info!("Logging at levels {}/{}", routerd_level, other_level);

    let asn = matches.value_of("asn").expect("Must specify an ASN");
    let port: u16 = matches
        .value_of("port")
        .unwrap_or("179")
        .parse()
        .expect("Port must be an integer");
    let neighbors: Vec<&str> = matches
        .values_of("neighbors")
        .expect("Must specify at least one neighbor")
        .collect();

    let config = RouterConfig::from_args(asn, port, &neighbors)?;
    debug!("Configured AS{} with {} neighbors", config.asn, config.neighbors.len());

    serve(config).await?;

    Ok(())
}
