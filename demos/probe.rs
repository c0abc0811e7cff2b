use async_dhcp_probe::{ProbeSession, SessionConfigBuilder};
use clap::Parser;
use pnet::util::MacAddr;
use std::io::Write;

/// Simple example to show DHCP probing capabilities
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Network interface name to send and receive DHCP messages
    #[arg(short, long)]
    iface: String,
    /// Hardware addresses to probe on behalf of (repeatable)
    #[arg(short, long = "mac", required = true)]
    macs: Vec<String>,
    /// Host name embedded in each Discover (DHCP option 12)
    #[arg(long)]
    host_name: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    let addresses: Vec<MacAddr> = args
        .macs
        .iter()
        .map(|mac| {
            mac.parse()
                .unwrap_or_else(|err| panic!("invalid MAC address {}: {:?}", mac, err))
        })
        .collect();

    let mut builder = SessionConfigBuilder::new(&args.iface).with_addresses(addresses);
    if let Some(host_name) = &args.host_name {
        builder = builder.with_host_name(host_name);
    }

    let session = ProbeSession::new(builder.build()).unwrap();
    let mut handle = session.start();

    let mut stdout = std::io::stdout().lock();
    let status = loop {
        tokio::select! {
            Some(offer) = handle.offers.recv() => {
                writeln!(stdout, "{:?}", offer).unwrap();
            }
            status = &mut handle.status => {
                break status;
            }
        }
    };
    // Offers published just before the terminal status may still be queued.
    while let Ok(offer) = handle.offers.try_recv() {
        writeln!(stdout, "{:?}", offer).unwrap();
    }
    match status {
        Ok(status) => writeln!(stdout, "{:?}", status).unwrap(),
        Err(_) => writeln!(stdout, "session ended without a status").unwrap(),
    }
}
