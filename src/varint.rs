//! Bitcoin's `CompactSize` varint, used both for the `'u'` namespace's
//! var-length script field (§3) and for the peer-wire response framing (§4.8).

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::{Error, Result};

pub fn write_compact_size(buf: &mut Vec<u8>, n: u64) {
	if n < 0xfd {
		buf.push(n as u8);
	} else if n <= 0xffff {
		buf.push(0xfd);
		buf.write_u16::<LittleEndian>(n as u16).unwrap();
	} else if n <= 0xffff_ffff {
		buf.push(0xfe);
		buf.write_u32::<LittleEndian>(n as u32).unwrap();
	} else {
		buf.push(0xff);
		buf.write_u64::<LittleEndian>(n).unwrap();
	}
}

/// Returns `(value, bytes_consumed)`.
pub fn read_compact_size(bytes: &[u8]) -> Result<(u64, usize)> {
	let first = *bytes.first().ok_or_else(|| Error::Storage("truncated compact size".into()))?;
	match first {
		0..=0xfc => Ok((first as u64, 1)),
		0xfd => {
			if bytes.len() < 3 {
				return Err(Error::Storage("truncated compact size (u16)".into()));
			}
			Ok((u16::from_le_bytes([bytes[1], bytes[2]]) as u64, 3))
		}
		0xfe => {
			if bytes.len() < 5 {
				return Err(Error::Storage("truncated compact size (u32)".into()));
			}
			Ok((u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as u64, 5))
		}
		0xff => {
			if bytes.len() < 9 {
				return Err(Error::Storage("truncated compact size (u64)".into()));
			}
			let mut arr = [0u8; 8];
			arr.copy_from_slice(&bytes[1..9]);
			Ok((u64::from_le_bytes(arr), 9))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_all_size_classes() {
		for n in [0u64, 1, 0xfc, 0xfd, 0xffff, 0x1_0000, 0xffff_ffff, 0x1_0000_0000, u64::MAX] {
			let mut buf = Vec::new();
			write_compact_size(&mut buf, n);
			let (decoded, consumed) = read_compact_size(&buf).unwrap();
			assert_eq!(decoded, n);
			assert_eq!(consumed, buf.len());
		}
	}
}
