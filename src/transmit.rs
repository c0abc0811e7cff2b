use log::{debug, warn};
use pnet::util::MacAddr;

use crate::capture::FrameSink;
use crate::error::Result;
use crate::frame::FrameTemplate;

/// Broadcasts one Discover per address, in caller order, without waiting for
/// replies. A failed probe is reported and skipped; the remaining addresses
/// are still sent. Returns how many frames made it onto the wire.
pub(crate) async fn send_probes<S: FrameSink>(
    sink: &mut S,
    template: &FrameTemplate,
    addresses: &[MacAddr],
) -> usize {
    let mut sent = 0;
    for address in addresses {
        match send_probe(sink, template, *address).await {
            Ok(()) => {
                debug!("sent discover probe for {}", address);
                sent += 1;
            }
            Err(err) => warn!("probe for {} not sent: {}", address, err),
        }
    }
    debug!("sent {}/{} discover probes", sent, addresses.len());
    sent
}

async fn send_probe<S: FrameSink>(
    sink: &mut S,
    template: &FrameTemplate,
    address: MacAddr,
) -> Result<()> {
    let frame = template.discover_frame(address)?;
    sink.send_frame(&frame).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::testing::ChannelSink;
    use pnet::packet::dhcp::DhcpPacket;
    use tokio::sync::mpsc;

    use crate::constants::{ETHERNET_HEADER_LEN, IPV4_HEADER_LEN, UDP_HEADER_LEN};

    fn chaddr_of(frame: &[u8]) -> MacAddr {
        let dhcp =
            DhcpPacket::new(&frame[ETHERNET_HEADER_LEN + IPV4_HEADER_LEN + UDP_HEADER_LEN..])
                .unwrap();
        dhcp.get_chaddr()
    }

    #[tokio::test]
    async fn probes_go_out_in_caller_order() {
        let addresses = [
            MacAddr::new(0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa),
            MacAddr::new(0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb),
            MacAddr::new(0xcc, 0xcc, 0xcc, 0xcc, 0xcc, 0xcc),
        ];
        let (wire_tx, mut wire_rx) = mpsc::unbounded_channel();
        let mut sink = ChannelSink(wire_tx);
        let template = FrameTemplate::new(42, None);

        let sent = send_probes(&mut sink, &template, &addresses).await;
        assert_eq!(sent, addresses.len());

        for address in addresses {
            let frame = wire_rx.recv().await.unwrap();
            assert_eq!(chaddr_of(&frame), address);
        }
        assert!(wire_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn encoding_failures_do_not_abort_the_run() {
        let addresses = [
            MacAddr::new(0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa),
            MacAddr::new(0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb),
        ];
        let (wire_tx, mut wire_rx) = mpsc::unbounded_channel();
        let mut sink = ChannelSink(wire_tx);
        // A host name too long for its option makes every build fail; the
        // transmitter must still walk the whole list without erroring out.
        let broken = FrameTemplate::new(42, Some("x".repeat(300)));
        assert_eq!(send_probes(&mut sink, &broken, &addresses).await, 0);
        assert!(wire_rx.try_recv().is_err());

        let template = FrameTemplate::new(42, None);
        assert_eq!(send_probes(&mut sink, &template, &addresses).await, 2);
    }

    #[tokio::test]
    async fn closed_capture_is_reported_not_propagated() {
        let (wire_tx, wire_rx) = mpsc::unbounded_channel();
        drop(wire_rx);
        let mut sink = ChannelSink(wire_tx);
        let template = FrameTemplate::new(42, None);
        let sent = send_probes(
            &mut sink,
            &template,
            &[MacAddr::new(0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa)],
        )
        .await;
        assert_eq!(sent, 0);
    }
}
