//! Binary wire formats
//!
//! The order layout is shared by journal `NewOrder` payloads and snapshot
//! order entries. All integers are big-endian.
//!
//! # Order layout (87 bytes)
//! ```text
//!  8 – id
//!  4 – symbol id
//!  1 – type
//!  1 – side
//!  8 – price
//!  8 – stop price
//!  8 – quantity
//!  8 – executed quantity
//!  8 – leaves quantity
//!  1 – time-in-force
//!  8 – max visible quantity
//!  8 – slippage
//!  8 – trailing distance (signed)
//!  8 – trailing step (signed)
//! ```
//!
//! # Journal record layout
//! ```text
//! 4 bytes – payload length (excludes this prefix)
//! 1 byte  – event tag (1 = NewOrder, 2 = CancelOrder)
//! 8 bytes – accept timestamp (Unix nanoseconds, signed)
//! N bytes – event-specific payload:
//!             NewOrder:    87 bytes (order)
//!             CancelOrder:  8 bytes (order id)
//! ```

use thiserror::Error;
use types::prelude::*;

/// Fixed byte size of a serialised order.
pub const ORDER_WIRE_SIZE: usize = 87;

/// Tag + timestamp, shared by every journal record payload.
pub const EVENT_HEADER_SIZE: usize = 9;

/// Wire-level decode failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("invalid record length {0}")]
    InvalidRecordLength(u32),

    #[error("unknown event tag {0}")]
    UnknownEventTag(u8),

    #[error("short {kind} payload ({len} bytes)")]
    ShortPayload { kind: &'static str, len: usize },

    #[error("record payload truncated: need {needed} bytes, have {available}")]
    TruncatedPayload { needed: usize, available: usize },

    #[error("invalid order type {0}")]
    InvalidOrderType(u8),

    #[error("invalid order side {0}")]
    InvalidOrderSide(u8),

    #[error("invalid time-in-force {0}")]
    InvalidTimeInForce(u8),
}

/// The unit persisted to the journal: an accepted command with the
/// nanosecond timestamp at which it was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchingEvent {
    NewOrder { timestamp: i64, order: Order },
    CancelOrder { timestamp: i64, order_id: OrderId },
}

/// Wire tag for `NewOrder` records.
pub const NEW_ORDER_TAG: u8 = 1;
/// Wire tag for `CancelOrder` records.
pub const CANCEL_ORDER_TAG: u8 = 2;

impl MatchingEvent {
    pub fn timestamp(&self) -> i64 {
        match self {
            MatchingEvent::NewOrder { timestamp, .. } => *timestamp,
            MatchingEvent::CancelOrder { timestamp, .. } => *timestamp,
        }
    }

    pub fn tag(&self) -> u8 {
        match self {
            MatchingEvent::NewOrder { .. } => NEW_ORDER_TAG,
            MatchingEvent::CancelOrder { .. } => CANCEL_ORDER_TAG,
        }
    }
}

/// Serialise an order into `buf`, which must hold at least
/// [`ORDER_WIRE_SIZE`] bytes.
pub fn encode_order(buf: &mut [u8], order: &Order) {
    buf[0..8].copy_from_slice(&order.id.as_u64().to_be_bytes());
    buf[8..12].copy_from_slice(&order.symbol_id.as_u32().to_be_bytes());
    buf[12] = order.order_type as u8;
    buf[13] = order.side as u8;
    buf[14..22].copy_from_slice(&order.price.as_u64().to_be_bytes());
    buf[22..30].copy_from_slice(&order.stop_price.as_u64().to_be_bytes());
    buf[30..38].copy_from_slice(&order.quantity.as_u64().to_be_bytes());
    buf[38..46].copy_from_slice(&order.executed_quantity.as_u64().to_be_bytes());
    buf[46..54].copy_from_slice(&order.leaves_quantity.as_u64().to_be_bytes());
    buf[54] = order.time_in_force as u8;
    buf[55..63].copy_from_slice(&order.max_visible_quantity.as_u64().to_be_bytes());
    buf[63..71].copy_from_slice(&order.slippage.as_u64().to_be_bytes());
    buf[71..79].copy_from_slice(&order.trailing_distance.to_be_bytes());
    buf[79..87].copy_from_slice(&order.trailing_step.to_be_bytes());
}

/// Deserialise an order from `buf`, which must hold at least
/// [`ORDER_WIRE_SIZE`] bytes.
pub fn decode_order(buf: &[u8]) -> Result<Order, WireError> {
    let order_type = OrderType::from_u8(buf[12]).ok_or(WireError::InvalidOrderType(buf[12]))?;
    let side = OrderSide::from_u8(buf[13]).ok_or(WireError::InvalidOrderSide(buf[13]))?;
    let time_in_force =
        TimeInForce::from_u8(buf[54]).ok_or(WireError::InvalidTimeInForce(buf[54]))?;

    Ok(Order {
        id: OrderId::new(read_u64(buf, 0)),
        symbol_id: SymbolId::new(read_u32(buf, 8)),
        order_type,
        side,
        price: Price::new(read_u64(buf, 14)),
        stop_price: Price::new(read_u64(buf, 22)),
        quantity: Quantity::new(read_u64(buf, 30)),
        executed_quantity: Quantity::new(read_u64(buf, 38)),
        leaves_quantity: Quantity::new(read_u64(buf, 46)),
        time_in_force,
        max_visible_quantity: Quantity::new(read_u64(buf, 55)),
        slippage: Price::new(read_u64(buf, 63)),
        trailing_distance: read_i64(buf, 71),
        trailing_step: read_i64(buf, 79),
    })
}

/// Encode an event as a length-prefixed journal record.
pub fn encode_event(event: &MatchingEvent) -> Vec<u8> {
    let payload_size = match event {
        MatchingEvent::NewOrder { .. } => EVENT_HEADER_SIZE + ORDER_WIRE_SIZE,
        MatchingEvent::CancelOrder { .. } => EVENT_HEADER_SIZE + 8,
    };

    let mut record = vec![0u8; 4 + payload_size];
    record[0..4].copy_from_slice(&(payload_size as u32).to_be_bytes());
    record[4] = event.tag();
    record[5..13].copy_from_slice(&event.timestamp().to_be_bytes());

    match event {
        MatchingEvent::NewOrder { order, .. } => {
            encode_order(&mut record[13..13 + ORDER_WIRE_SIZE], order);
        }
        MatchingEvent::CancelOrder { order_id, .. } => {
            record[13..21].copy_from_slice(&order_id.as_u64().to_be_bytes());
        }
    }
    record
}

/// Decode one length-prefixed record from the front of `buf`.
///
/// Returns `Ok(None)` at a clean end of input, including a short read inside
/// the 4-byte length prefix (a crash-truncated tail). A record shorter than
/// the event header, an unknown tag, or a payload cut short after a complete
/// length prefix is a hard error.
pub fn decode_event(buf: &[u8]) -> Result<Option<(MatchingEvent, usize)>, WireError> {
    if buf.len() < 4 {
        return Ok(None);
    }
    let payload_len = read_u32(buf, 0) as usize;
    if payload_len < EVENT_HEADER_SIZE {
        return Err(WireError::InvalidRecordLength(payload_len as u32));
    }
    let total = 4 + payload_len;
    if buf.len() < total {
        return Err(WireError::TruncatedPayload {
            needed: total,
            available: buf.len(),
        });
    }

    let payload = &buf[4..total];
    let tag = payload[0];
    let timestamp = read_i64(payload, 1);

    let event = match tag {
        NEW_ORDER_TAG => {
            if payload.len() < EVENT_HEADER_SIZE + ORDER_WIRE_SIZE {
                return Err(WireError::ShortPayload {
                    kind: "NewOrder",
                    len: payload.len(),
                });
            }
            let order = decode_order(&payload[EVENT_HEADER_SIZE..])?;
            MatchingEvent::NewOrder { timestamp, order }
        }
        CANCEL_ORDER_TAG => {
            if payload.len() < EVENT_HEADER_SIZE + 8 {
                return Err(WireError::ShortPayload {
                    kind: "CancelOrder",
                    len: payload.len(),
                });
            }
            let order_id = OrderId::new(read_u64(payload, EVENT_HEADER_SIZE));
            MatchingEvent::CancelOrder {
                timestamp,
                order_id,
            }
        }
        other => return Err(WireError::UnknownEventTag(other)),
    };

    Ok(Some((event, total)))
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(buf[offset..offset + 4].try_into().unwrap())
}

fn read_u64(buf: &[u8], offset: usize) -> u64 {
    u64::from_be_bytes(buf[offset..offset + 8].try_into().unwrap())
}

fn read_i64(buf: &[u8], offset: usize) -> i64 {
    i64::from_be_bytes(buf[offset..offset + 8].try_into().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> Order {
        let mut order = Order::limit(
            OrderId::new(42),
            SymbolId::new(7),
            OrderSide::Sell,
            Price::new(10_000),
            Quantity::new(500),
        );
        order.executed_quantity = Quantity::new(120);
        order.leaves_quantity = Quantity::new(380);
        order.max_visible_quantity = Quantity::new(50);
        order.slippage = Price::new(25);
        order.trailing_distance = -1_000;
        order.trailing_step = 10;
        order
    }

    #[test]
    fn test_order_roundtrip() {
        let order = sample_order();
        let mut buf = [0u8; ORDER_WIRE_SIZE];
        encode_order(&mut buf, &order);
        let decoded = decode_order(&buf).unwrap();
        assert_eq!(decoded, order);
    }

    #[test]
    fn test_order_layout_offsets() {
        let order = sample_order();
        let mut buf = [0u8; ORDER_WIRE_SIZE];
        encode_order(&mut buf, &order);

        assert_eq!(u64::from_be_bytes(buf[0..8].try_into().unwrap()), 42);
        assert_eq!(u32::from_be_bytes(buf[8..12].try_into().unwrap()), 7);
        assert_eq!(buf[12], OrderType::Limit as u8);
        assert_eq!(buf[13], OrderSide::Sell as u8);
        assert_eq!(u64::from_be_bytes(buf[14..22].try_into().unwrap()), 10_000);
        assert_eq!(buf[54], TimeInForce::Gtc as u8);
        assert_eq!(
            i64::from_be_bytes(buf[71..79].try_into().unwrap()),
            -1_000
        );
    }

    #[test]
    fn test_new_order_record_size() {
        let event = MatchingEvent::NewOrder {
            timestamp: 1_000,
            order: sample_order(),
        };
        let record = encode_event(&event);
        assert_eq!(record.len(), 4 + 9 + 87);
        assert_eq!(record[4], NEW_ORDER_TAG);
    }

    #[test]
    fn test_cancel_order_record_size() {
        let event = MatchingEvent::CancelOrder {
            timestamp: 2_000,
            order_id: OrderId::new(42),
        };
        let record = encode_event(&event);
        assert_eq!(record.len(), 4 + 9 + 8);
        assert_eq!(record[4], CANCEL_ORDER_TAG);
    }

    #[test]
    fn test_event_roundtrip() {
        let events = [
            MatchingEvent::NewOrder {
                timestamp: 1_708_123_456_789_000_000,
                order: sample_order(),
            },
            MatchingEvent::CancelOrder {
                timestamp: 1_708_123_456_790_000_000,
                order_id: OrderId::new(42),
            },
        ];
        for event in events {
            let record = encode_event(&event);
            let (decoded, consumed) = decode_event(&record).unwrap().unwrap();
            assert_eq!(consumed, record.len());
            assert_eq!(decoded, event);
        }
    }

    #[test]
    fn test_decode_empty_and_short_prefix() {
        assert_eq!(decode_event(&[]).unwrap(), None);
        assert_eq!(decode_event(&[0, 0, 1]).unwrap(), None);
    }

    #[test]
    fn test_decode_record_below_minimum_length() {
        let mut record = vec![0u8; 12];
        record[0..4].copy_from_slice(&8u32.to_be_bytes());
        assert_eq!(
            decode_event(&record),
            Err(WireError::InvalidRecordLength(8))
        );
    }

    #[test]
    fn test_decode_unknown_tag() {
        let event = MatchingEvent::CancelOrder {
            timestamp: 1,
            order_id: OrderId::new(1),
        };
        let mut record = encode_event(&event);
        record[4] = 9;
        assert_eq!(decode_event(&record), Err(WireError::UnknownEventTag(9)));
    }

    #[test]
    fn test_decode_truncated_payload_is_hard_error() {
        let event = MatchingEvent::NewOrder {
            timestamp: 1,
            order: sample_order(),
        };
        let record = encode_event(&event);
        // Complete length prefix, payload cut short.
        let result = decode_event(&record[..20]);
        assert!(matches!(
            result,
            Err(WireError::TruncatedPayload { .. })
        ));
    }

    #[test]
    fn test_decode_invalid_order_side() {
        let event = MatchingEvent::NewOrder {
            timestamp: 1,
            order: sample_order(),
        };
        let mut record = encode_event(&event);
        record[13 + 13] = 7; // side byte inside the order payload
        assert_eq!(decode_event(&record), Err(WireError::InvalidOrderSide(7)));
    }
}
