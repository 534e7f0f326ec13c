//! Classic pcap reader. Only what a replay needs: record timestamps and the UDP
//! payload of each IPv4 frame. Everything else is counted and skipped.

use std::{fs, ops::Range, path::Path, time::Duration};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use bytes::Bytes;
use tracing::{debug, warn};

const GLOBAL_HEADER_LEN: usize = 24;
const RECORD_HEADER_LEN: usize = 16;

const MAGIC_MICROS: u32 = 0xa1b2_c3d4;
const MAGIC_NANOS: u32 = 0xa1b2_3c4d;

pub const LINKTYPE_NULL: u32 = 0;
pub const LINKTYPE_ETHERNET: u32 = 1;
pub const LINKTYPE_RAW: u32 = 101;
pub const LINKTYPE_LINUX_SLL: u32 = 113;
pub const LINKTYPE_IPV4: u32 = 228;

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_VLAN: u16 = 0x8100;
const AF_INET: u32 = 2;
const IPPROTO_UDP: u8 = 17;
const IPV4_MIN_HEADER: usize = 20;
const UDP_HEADER_LEN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture io: {0}")]
    Io(#[from] std::io::Error),
    #[error("file too short for a pcap header ({0} bytes)")]
    TooShort(usize),
    #[error("not a classic pcap file (magic {0:#010x})")]
    BadMagic(u32),
    #[error("unsupported link type {0}")]
    UnsupportedLinkType(u32),
}

/// One UDP payload and when it was captured, relative to the first record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPacket {
    pub offset: Duration,
    pub payload: Bytes,
}

#[derive(Debug, Clone, Default)]
pub struct Capture {
    pub link_type: u32,
    pub packets: Vec<CapturedPacket>,
    /// Records read, including the skipped ones.
    pub records: usize,
    /// Records without a UDP payload.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy)]
enum Endian {
    Little,
    Big,
}

impl Endian {
    fn u32(self, b: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(b),
            Endian::Big => BigEndian::read_u32(b),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FileFormat {
    endian: Endian,
    nanos: bool,
}

fn detect(magic: &[u8]) -> Option<FileFormat> {
    let (endian, nanos) = match (LittleEndian::read_u32(magic), BigEndian::read_u32(magic)) {
        (MAGIC_MICROS, _) => (Endian::Little, false),
        (MAGIC_NANOS, _) => (Endian::Little, true),
        (_, MAGIC_MICROS) => (Endian::Big, false),
        (_, MAGIC_NANOS) => (Endian::Big, true),
        _ => return None,
    };
    Some(FileFormat { endian, nanos })
}

pub fn read_file(path: &Path) -> Result<Capture, CaptureError> {
    let raw = fs::read(path)?;
    parse(Bytes::from(raw))
}

/// Parse a whole capture held in memory. Payloads are slices of `data`.
/// A record cut short at the end of the file ends the capture with a warning.
pub fn parse(data: Bytes) -> Result<Capture, CaptureError> {
    if data.len() < GLOBAL_HEADER_LEN {
        return Err(CaptureError::TooShort(data.len()));
    }
    let format = detect(&data[..4]).ok_or_else(|| CaptureError::BadMagic(LittleEndian::read_u32(&data[..4])))?;
    // upper bits may carry FCS flags
    let link_type = format.endian.u32(&data[20..24]) & 0xffff;
    if !matches!(link_type, LINKTYPE_NULL | LINKTYPE_ETHERNET | LINKTYPE_RAW | LINKTYPE_LINUX_SLL | LINKTYPE_IPV4) {
        return Err(CaptureError::UnsupportedLinkType(link_type));
    }

    let mut capture = Capture { link_type, ..Default::default() };
    let mut first: Option<Duration> = None;
    let mut pos = GLOBAL_HEADER_LEN;

    while pos < data.len() {
        if data.len() - pos < RECORD_HEADER_LEN {
            warn!(offset = pos, "truncated record header, stopping");
            break;
        }
        let h = &data[pos..pos + RECORD_HEADER_LEN];
        let secs = format.endian.u32(&h[0..4]);
        let frac = format.endian.u32(&h[4..8]);
        let incl_len = format.endian.u32(&h[8..12]) as usize;

        let body_start = pos + RECORD_HEADER_LEN;
        let Some(body_end) = body_start.checked_add(incl_len).filter(|&end| end <= data.len()) else {
            warn!(offset = pos, incl_len, "truncated record body, stopping");
            break;
        };

        let nanos = if format.nanos { frac } else { frac.saturating_mul(1_000) };
        let ts = Duration::new(u64::from(secs), nanos);
        // the first record is the zero point even when it carries no payload
        let base = *first.get_or_insert(ts);
        capture.records += 1;

        match udp_payload(link_type, &data[body_start..body_end]) {
            Some(range) => capture.packets.push(CapturedPacket {
                offset: ts.saturating_sub(base),
                payload: data.slice(body_start + range.start..body_start + range.end),
            }),
            None => capture.skipped += 1,
        }
        pos = body_end;
    }

    debug!(
        link_type,
        records = capture.records,
        packets = capture.packets.len(),
        skipped = capture.skipped,
        "capture parsed"
    );
    Ok(capture)
}

/// Byte range of the UDP payload inside one link-layer frame.
fn udp_payload(link_type: u32, frame: &[u8]) -> Option<Range<usize>> {
    let ip_offset = match link_type {
        LINKTYPE_ETHERNET => {
            let mut ethertype = BigEndian::read_u16(frame.get(12..14)?);
            let mut offset = 14;
            if ethertype == ETHERTYPE_VLAN {
                ethertype = BigEndian::read_u16(frame.get(16..18)?);
                offset = 18;
            }
            (ethertype == ETHERTYPE_IPV4).then_some(offset)?
        }
        LINKTYPE_LINUX_SLL => (BigEndian::read_u16(frame.get(14..16)?) == ETHERTYPE_IPV4).then_some(16)?,
        // family is written in the capturing host's byte order
        LINKTYPE_NULL => {
            let family = frame.get(0..4)?;
            (LittleEndian::read_u32(family) == AF_INET || BigEndian::read_u32(family) == AF_INET).then_some(4)?
        }
        LINKTYPE_RAW | LINKTYPE_IPV4 => 0,
        _ => return None,
    };
    let r = ipv4_udp(frame.get(ip_offset..)?)?;
    Some(ip_offset + r.start..ip_offset + r.end)
}

fn ipv4_udp(ip: &[u8]) -> Option<Range<usize>> {
    if ip.len() < IPV4_MIN_HEADER || ip[0] >> 4 != 4 || ip[9] != IPPROTO_UDP {
        return None;
    }
    let ihl = usize::from(ip[0] & 0x0f) * 4;
    // later fragments carry no UDP header
    let fragment_offset = BigEndian::read_u16(&ip[6..8]) & 0x1fff;
    if ihl < IPV4_MIN_HEADER || fragment_offset != 0 {
        return None;
    }
    // 0 shows up with segmentation offload; trust the captured length then
    let total = match usize::from(BigEndian::read_u16(&ip[2..4])) {
        0 => ip.len(),
        n => n.min(ip.len()),
    };
    let start = ihl + UDP_HEADER_LEN;
    if total < start {
        return None;
    }
    let udp_len = usize::from(BigEndian::read_u16(&ip[ihl + 4..ihl + 6]));
    let end = if udp_len >= UDP_HEADER_LEN { (ihl + udp_len).min(total) } else { total };
    (end > start).then_some(start..end)
}
