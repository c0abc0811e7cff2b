use pnet::util::MacAddr;
use std::net::Ipv4Addr;

/// A single recognized DHCP Offer, correlated to the probed hardware address
/// through the reply's client-hardware-address field.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct OfferRecord {
    /// Hardware address the offer was addressed to.
    pub source_mac: MacAddr,
    /// Address the server proposed to lease ("your IP" field).
    pub offered_ip: Ipv4Addr,
    /// Server that made the offer (server-identifier option).
    pub dhcp_server: Ipv4Addr,
}

/// Terminal outcome of a probe session; exactly one is produced per session.
///
/// `Completed` means every requested address was answered, though not
/// necessarily with an offer: servers replying Nak (or anything undecodable)
/// count toward completion without producing an [`OfferRecord`], so `offers`
/// may be smaller than the number of requested addresses.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SessionStatus {
    Completed { offers: usize },
    TimedOut { offers: usize },
}

impl SessionStatus {
    /// Number of offers observed before the session terminated.
    pub fn offers(&self) -> usize {
        match self {
            SessionStatus::Completed { offers } | SessionStatus::TimedOut { offers } => *offers,
        }
    }
}
