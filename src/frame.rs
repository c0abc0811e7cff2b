use std::net::Ipv4Addr;

use pnet::packet::dhcp::{DhcpHardwareTypes, DhcpOperations, MutableDhcpPacket};
use pnet::packet::ethernet::{EtherTypes, MutableEthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::{self, MutableIpv4Packet};
use pnet::packet::udp::{self, MutableUdpPacket};
use pnet::packet::MutablePacket;
use pnet::util::MacAddr;

use crate::constants::{
    DHCP_CLIENT_PORT, DHCP_FIXED_LEN, DHCP_SERVER_PORT, ETHERNET_HEADER_LEN, IPV4_HEADER_LEN,
    MAC_ADDR_LEN, MAGIC_COOKIE, MSG_TYPE_DISCOVER, OPT_END, OPT_HOST_NAME, OPT_MESSAGE_TYPE,
    OPT_PARAMETER_REQUEST_LIST, PARAMETER_REQUEST_LIST, PROBE_TTL, UDP_HEADER_LEN,
};
use crate::error::{Error, Result};

/// Per-session description of the Ethernet/IPv4/UDP/DHCP layers shared by
/// every probe. Only the probing hardware address varies between frames; the
/// transaction id is drawn once per session, so replies are correlated through
/// the client-hardware-address field they echo back.
#[derive(Debug, Clone)]
pub struct FrameTemplate {
    xid: u32,
    host_name: Option<String>,
}

impl FrameTemplate {
    pub fn new(xid: u32, host_name: Option<String>) -> Self {
        Self { xid, host_name }
    }

    pub fn xid(&self) -> u32 {
        self.xid
    }

    /// Serializes a complete Discover broadcast frame for `address`, with the
    /// IPv4 header checksum and the UDP pseudo-header checksum filled in.
    pub fn discover_frame(&self, address: MacAddr) -> Result<Vec<u8>> {
        let options = self.encode_options()?;
        let dhcp_len = DHCP_FIXED_LEN + options.len();
        let udp_len = UDP_HEADER_LEN + dhcp_len;
        let ip_len = IPV4_HEADER_LEN + udp_len;
        let mut frame = vec![0u8; ETHERNET_HEADER_LEN + ip_len];

        let mut eth = MutableEthernetPacket::new(&mut frame)
            .ok_or_else(|| Error::Encoding("ethernet header does not fit".into()))?;
        eth.set_destination(MacAddr::broadcast());
        eth.set_source(address);
        eth.set_ethertype(EtherTypes::Ipv4);

        let dhcp_offset = ETHERNET_HEADER_LEN + IPV4_HEADER_LEN + UDP_HEADER_LEN;
        let mut dhcp = MutableDhcpPacket::new(&mut frame[dhcp_offset..])
            .ok_or_else(|| Error::Encoding("dhcp message does not fit".into()))?;
        dhcp.set_op(DhcpOperations::Request);
        dhcp.set_htype(DhcpHardwareTypes::Ethernet);
        dhcp.set_hlen(MAC_ADDR_LEN);
        dhcp.set_xid(self.xid);
        dhcp.set_ciaddr(Ipv4Addr::UNSPECIFIED);
        dhcp.set_chaddr(address);
        dhcp.payload_mut()[..options.len()].copy_from_slice(&options);

        let udp_offset = ETHERNET_HEADER_LEN + IPV4_HEADER_LEN;
        let mut udp = MutableUdpPacket::new(&mut frame[udp_offset..])
            .ok_or_else(|| Error::Encoding("udp header does not fit".into()))?;
        udp.set_source(DHCP_CLIENT_PORT);
        udp.set_destination(DHCP_SERVER_PORT);
        udp.set_length(udp_len as u16);
        let checksum = udp::ipv4_checksum(
            &udp.to_immutable(),
            &Ipv4Addr::UNSPECIFIED,
            &Ipv4Addr::BROADCAST,
        );
        udp.set_checksum(checksum);

        let mut ip = MutableIpv4Packet::new(&mut frame[ETHERNET_HEADER_LEN..])
            .ok_or_else(|| Error::Encoding("ipv4 header does not fit".into()))?;
        ip.set_version(4);
        ip.set_header_length((IPV4_HEADER_LEN / 4) as u8);
        ip.set_total_length(ip_len as u16);
        ip.set_ttl(PROBE_TTL);
        ip.set_next_level_protocol(IpNextHeaderProtocols::Udp);
        ip.set_source(Ipv4Addr::UNSPECIFIED);
        ip.set_destination(Ipv4Addr::BROADCAST);
        let checksum = ipv4::checksum(&ip.to_immutable());
        ip.set_checksum(checksum);

        Ok(frame)
    }

    /// Magic cookie followed by the option list; identical for every probe in
    /// the session.
    fn encode_options(&self) -> Result<Vec<u8>> {
        let mut options = Vec::with_capacity(64);
        options.extend_from_slice(&MAGIC_COOKIE);
        options.extend_from_slice(&[OPT_MESSAGE_TYPE, 1, MSG_TYPE_DISCOVER]);
        options.push(OPT_PARAMETER_REQUEST_LIST);
        options.push(PARAMETER_REQUEST_LIST.len() as u8);
        options.extend_from_slice(&PARAMETER_REQUEST_LIST);
        if let Some(host_name) = &self.host_name {
            if host_name.is_empty() || host_name.len() > u8::MAX as usize {
                return Err(Error::Encoding(format!(
                    "host name of {} bytes does not fit a single option",
                    host_name.len()
                )));
            }
            options.push(OPT_HOST_NAME);
            options.push(host_name.len() as u8);
            options.extend_from_slice(host_name.as_bytes());
        }
        options.push(OPT_END);
        Ok(options)
    }
}
