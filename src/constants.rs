pub(crate) const MAC_ADDR_LEN: u8 = 6;

pub(crate) const ETHERNET_HEADER_LEN: usize = 14;
pub(crate) const IPV4_HEADER_LEN: usize = 20;
pub(crate) const UDP_HEADER_LEN: usize = 8;
/// Fixed-format DHCP region up to (not including) the options field.
pub(crate) const DHCP_FIXED_LEN: usize = 236;
/// Largest non-jumbo Ethernet frame the receive path has to accommodate.
pub(crate) const MAX_FRAME_LEN: usize = 1514;

pub(crate) const DHCP_SERVER_PORT: u16 = 67;
pub(crate) const DHCP_CLIENT_PORT: u16 = 68;

pub(crate) const PROBE_TTL: u8 = 64;

pub(crate) const MAGIC_COOKIE: [u8; 4] = [0x63, 0x82, 0x53, 0x63];

pub(crate) const OPT_PAD: u8 = 0;
pub(crate) const OPT_HOST_NAME: u8 = 12;
pub(crate) const OPT_MESSAGE_TYPE: u8 = 53;
pub(crate) const OPT_SERVER_ID: u8 = 54;
pub(crate) const OPT_PARAMETER_REQUEST_LIST: u8 = 55;
pub(crate) const OPT_END: u8 = 255;

pub(crate) const MSG_TYPE_DISCOVER: u8 = 1;
pub(crate) const MSG_TYPE_OFFER: u8 = 2;

/// Option codes requested in every Discover, in wire order.
pub(crate) const PARAMETER_REQUEST_LIST: [u8; 29] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 51, 52, 53, 54, 55, 56, 60,
    61, 67, 66,
];
