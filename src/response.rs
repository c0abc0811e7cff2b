use std::net::Ipv4Addr;

use log::{debug, warn};
use pnet::packet::dhcp::{DhcpOperations, DhcpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::udp::UdpPacket;
use pnet::packet::Packet;
use pnet::util::MacAddr;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};

use crate::capture::FrameSource;
use crate::constants::{
    DHCP_CLIENT_PORT, DHCP_SERVER_PORT, MAGIC_COOKIE, MAX_FRAME_LEN, MSG_TYPE_OFFER, OPT_END,
    OPT_MESSAGE_TYPE, OPT_PAD, OPT_SERVER_ID,
};
use crate::error::{Error, Result};
use crate::probe::{OfferRecord, SessionStatus};

/// A reply-direction DHCP frame, reduced to what the session cares about.
#[derive(Debug)]
pub(crate) enum Reply {
    Offer(OfferRecord),
    /// A server answered without offering: any non-Offer message type, or a
    /// reply whose options could not be decoded.
    Answered {
        client_mac: MacAddr,
        message_type: Option<u8>,
    },
}

/// Recognizes reply-direction DHCP frames. Anything else, including our own
/// outbound Discover broadcasts looped back by the capture handle, is `None`.
pub(crate) fn classify_frame(bytes: &[u8]) -> Option<Reply> {
    let eth = EthernetPacket::new(bytes)?;
    if eth.get_ethertype() != EtherTypes::Ipv4 {
        return None;
    }
    let ip = Ipv4Packet::new(eth.payload())?;
    if ip.get_next_level_protocol() != IpNextHeaderProtocols::Udp {
        return None;
    }
    let udp = UdpPacket::new(ip.payload())?;
    if udp.get_source() != DHCP_SERVER_PORT || udp.get_destination() != DHCP_CLIENT_PORT {
        return None;
    }
    let dhcp = DhcpPacket::new(udp.payload())?;
    if dhcp.get_op() != DhcpOperations::Reply {
        return None;
    }

    let client_mac = dhcp.get_chaddr();
    match parse_reply_options(dhcp.payload()) {
        Ok(options) => match (options.message_type, options.server_id) {
            (Some(MSG_TYPE_OFFER), Some(dhcp_server)) => Some(Reply::Offer(OfferRecord {
                source_mac: client_mac,
                offered_ip: dhcp.get_yiaddr(),
                dhcp_server,
            })),
            (Some(MSG_TYPE_OFFER), None) => {
                warn!("offer for {} lacks a server identifier", client_mac);
                Some(Reply::Answered {
                    client_mac,
                    message_type: Some(MSG_TYPE_OFFER),
                })
            }
            (message_type, _) => Some(Reply::Answered {
                client_mac,
                message_type,
            }),
        },
        Err(err) => {
            warn!("undecodable reply for {}: {}", client_mac, err);
            Some(Reply::Answered {
                client_mac,
                message_type: None,
            })
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ReplyOptions {
    pub(crate) message_type: Option<u8>,
    pub(crate) server_id: Option<Ipv4Addr>,
}

/// Walks the option list after the magic cookie, keeping the two options the
/// correlator needs.
pub(crate) fn parse_reply_options(options: &[u8]) -> Result<ReplyOptions> {
    if options.len() < MAGIC_COOKIE.len() || options[..MAGIC_COOKIE.len()] != MAGIC_COOKIE {
        return Err(Error::Decoding("missing DHCP magic cookie"));
    }
    let mut decoded = ReplyOptions::default();
    let mut rest = &options[MAGIC_COOKIE.len()..];
    while let Some((&code, tail)) = rest.split_first() {
        if code == OPT_END {
            return Ok(decoded);
        }
        if code == OPT_PAD {
            rest = tail;
            continue;
        }
        let (&len, tail) = tail
            .split_first()
            .ok_or(Error::Decoding("option length truncated"))?;
        if tail.len() < len as usize {
            return Err(Error::Decoding("option data truncated"));
        }
        let (data, tail) = tail.split_at(len as usize);
        match code {
            OPT_MESSAGE_TYPE => decoded.message_type = data.first().copied(),
            OPT_SERVER_ID => {
                if let [a, b, c, d] = *data {
                    decoded.server_id = Some(Ipv4Addr::new(a, b, c, d));
                } else {
                    return Err(Error::Decoding("server identifier is not an IPv4 address"));
                }
            }
            _ => {}
        }
        rest = tail;
    }
    Ok(decoded)
}

pub(crate) fn message_type_name(message_type: Option<u8>) -> &'static str {
    match message_type {
        Some(1) => "DISCOVER",
        Some(2) => "OFFER",
        Some(3) => "REQUEST",
        Some(4) => "DECLINE",
        Some(5) => "ACK",
        Some(6) => "NAK",
        Some(7) => "RELEASE",
        Some(8) => "INFORM",
        Some(_) => "UNKNOWN",
        None => "UNDECODED",
    }
}

/// Background receive task: reads inbound frames until a reply has arrived
/// for every probed address or the session deadline elapses, whichever comes
/// first, then publishes exactly one terminal status.
pub(crate) struct Listener<S> {
    source: S,
    expected: usize,
    deadline: Instant,
    records: mpsc::UnboundedSender<OfferRecord>,
    status: oneshot::Sender<SessionStatus>,
}

impl<S: FrameSource> Listener<S> {
    pub(crate) fn new(
        source: S,
        expected: usize,
        deadline: Instant,
        records: mpsc::UnboundedSender<OfferRecord>,
        status: oneshot::Sender<SessionStatus>,
    ) -> Self {
        Self {
            source,
            expected,
            deadline,
            records,
            status,
        }
    }

    pub(crate) async fn listen(self) {
        let Listener {
            mut source,
            expected,
            deadline,
            records,
            status,
        } = self;

        let outcome = if expected == 0 {
            // Nothing was probed, so there is nothing to wait for.
            SessionStatus::Completed { offers: 0 }
        } else {
            Self::accumulate(&mut source, expected, deadline, &records).await
        };
        debug!("session terminated: {:?}", outcome);
        let _ = status.send(outcome);
    }

    async fn accumulate(
        source: &mut S,
        expected: usize,
        deadline: Instant,
        records: &mpsc::UnboundedSender<OfferRecord>,
    ) -> SessionStatus {
        let mut received = 0usize;
        let mut offers = 0usize;
        let mut buf = [0u8; MAX_FRAME_LEN];
        loop {
            tokio::select! {
                _ = sleep_until(deadline) => {
                    break SessionStatus::TimedOut { offers };
                }
                read = source.recv_frame(&mut buf) => {
                    let read_bytes = match read {
                        Ok(read_bytes) => read_bytes,
                        Err(err) => {
                            // The read path is gone; the deadline is the only
                            // remaining way out.
                            warn!("error while reading the interface traffic: {}", err);
                            sleep_until(deadline).await;
                            break SessionStatus::TimedOut { offers };
                        }
                    };
                    match classify_frame(&buf[..read_bytes]) {
                        Some(Reply::Offer(record)) => {
                            debug!(
                                "offer for {}: {} from {}",
                                record.source_mac, record.offered_ip, record.dhcp_server
                            );
                            received += 1;
                            offers += 1;
                            // The caller may have stopped reading records; the
                            // reply still counts toward termination.
                            let _ = records.send(record);
                        }
                        Some(Reply::Answered { client_mac, message_type }) => {
                            debug!(
                                "{} reply for {}, no offer",
                                message_type_name(message_type),
                                client_mac
                            );
                            received += 1;
                        }
                        None => {}
                    }
                    if received == expected {
                        break SessionStatus::Completed { offers };
                    }
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{offer_frame, reply_frame, standard_options};
    use super::*;
    use crate::frame::FrameTemplate;

    const MSG_TYPE_NAK: u8 = 6;

    fn client_mac() -> MacAddr {
        MacAddr::new(0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa)
    }

    #[test]
    fn offer_decodes_into_a_record() {
        let offered_ip = Ipv4Addr::new(192, 168, 1, 50);
        let dhcp_server = Ipv4Addr::new(192, 168, 1, 1);
        let frame = offer_frame(client_mac(), offered_ip, dhcp_server);
        match classify_frame(&frame) {
            Some(Reply::Offer(record)) => {
                assert_eq!(record.source_mac, client_mac());
                assert_eq!(record.offered_ip, offered_ip);
                assert_eq!(record.dhcp_server, dhcp_server);
            }
            other => panic!("expected an offer, got {:?}", other),
        }
    }

    #[test]
    fn nak_counts_as_answered_without_a_record() {
        let frame = reply_frame(
            client_mac(),
            Ipv4Addr::UNSPECIFIED,
            1,
            &standard_options(MSG_TYPE_NAK, Some(Ipv4Addr::new(192, 168, 1, 1))),
        );
        match classify_frame(&frame) {
            Some(Reply::Answered {
                client_mac: mac,
                message_type,
            }) => {
                assert_eq!(mac, client_mac());
                assert_eq!(message_type, Some(MSG_TYPE_NAK));
            }
            other => panic!("expected an answered reply, got {:?}", other),
        }
    }

    #[test]
    fn offer_without_server_identifier_is_answered_only() {
        let frame = reply_frame(
            client_mac(),
            Ipv4Addr::new(192, 168, 1, 50),
            1,
            &standard_options(MSG_TYPE_OFFER, None),
        );
        assert!(matches!(
            classify_frame(&frame),
            Some(Reply::Answered {
                message_type: Some(MSG_TYPE_OFFER),
                ..
            })
        ));
    }

    #[test]
    fn truncated_options_are_answered_not_dropped() {
        // Reply filter matches but the option list stops mid-option.
        let frame = reply_frame(
            client_mac(),
            Ipv4Addr::new(192, 168, 1, 50),
            1,
            &[0x63, 0x82, 0x53, 0x63, OPT_MESSAGE_TYPE],
        );
        assert!(matches!(
            classify_frame(&frame),
            Some(Reply::Answered {
                message_type: None,
                ..
            })
        ));
    }

    #[test]
    fn missing_magic_cookie_is_a_decoding_error() {
        assert!(matches!(
            parse_reply_options(&[0xde, 0xad, 0xbe, 0xef, OPT_END]),
            Err(Error::Decoding(_))
        ));
    }

    #[test]
    fn own_discover_broadcast_is_ignored() {
        let template = FrameTemplate::new(7, None);
        let frame = template.discover_frame(client_mac()).unwrap();
        assert!(classify_frame(&frame).is_none());
    }

    #[test]
    fn non_dhcp_traffic_is_ignored() {
        assert!(classify_frame(&[0u8; 64]).is_none());
        assert!(classify_frame(&[]).is_none());
    }
}
