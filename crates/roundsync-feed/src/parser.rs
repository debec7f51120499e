//! Frame to event translation.
//!
//! Validates payloads and converts wire representations (ISO times, optional
//! fields) into the typed events the state machine consumes.

use crate::error::{FeedError, FeedResult};
use chrono::{DateTime, NaiveDateTime};
use roundsync_core::{Price, PriceSnapshot, RoundId, RoundOutcome, RoundStatus, Symbol};
use roundsync_ws::{InboundFrame, PriceTickPayload, RoundEndPayload, RoundStartPayload};
use tracing::{debug, warn};

/// Round length used when a start frame carries an unusable time range.
pub const DEFAULT_ROUND_DURATION_SECONDS: i64 = 600;

/// Lifecycle-start: full description of the round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundStart {
    pub id: RoundId,
    pub symbol: Symbol,
    pub display_name: Option<String>,
    pub open_price: Price,
    pub current_price: Price,
    pub price_change_percent: Option<f64>,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub total_duration_seconds: i64,
    pub remaining_seconds: i64,
    pub status: RoundStatus,
    pub bet_count: u32,
    /// Seed history, in wire order.
    pub history: Vec<PriceSnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceTick {
    pub price: Price,
    pub timestamp_ms: i64,
    pub change_percent: Option<f64>,
    pub remaining_seconds: i64,
    pub round_id: Option<RoundId>,
    pub symbol: Option<Symbol>,
}

impl PriceTick {
    pub fn snapshot(&self) -> PriceSnapshot {
        PriceSnapshot::new(self.timestamp_ms, self.price)
    }
}

/// Lifecycle-end: settlement result.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundEnd {
    pub id: RoundId,
    pub outcome: RoundOutcome,
    pub close_price: Price,
    pub price_change_percent: Option<f64>,
    pub symbol: Option<Symbol>,
}

/// Input of the round state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundEvent {
    LifecycleStart(RoundStart),
    PriceTick(PriceTick),
    LifecycleEnd(RoundEnd),
    /// No active round; carries the server's explanation.
    NoActiveRound { message: String },
    /// Opaque bet list change, forwarded untouched.
    BetsUpdate(serde_json::Value),
    /// Server-side error report.
    ServerError { message: String },
    /// Local countdown tick at wall-clock `now_ms`.
    Countdown { now_ms: i64 },
    /// The subscription moved to another symbol.
    SymbolSwitched(Symbol),
}

impl RoundEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LifecycleStart(_) => "lifecycle_start",
            Self::PriceTick(_) => "price_tick",
            Self::LifecycleEnd(_) => "lifecycle_end",
            Self::NoActiveRound { .. } => "no_active_round",
            Self::BetsUpdate(_) => "bets_update",
            Self::ServerError { .. } => "server_error",
            Self::Countdown { .. } => "countdown",
            Self::SymbolSwitched(_) => "symbol_switched",
        }
    }
}

/// Parse an ISO-8601 instant into epoch milliseconds.
///
/// Accepts RFC 3339 (`2024-05-01T12:00:00Z`, offsets, fractional seconds)
/// and naive timestamps with a trailing `Z` appended to an offset.
pub fn parse_iso_ms(s: &str) -> FeedResult<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }

    // "...+00:00Z": an offset-aware isoformat() with a Z suffix.
    let trimmed = s.strip_suffix('Z').unwrap_or(s);
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.timestamp_millis());
    }

    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().timestamp_millis())
        .map_err(|e| FeedError::InvalidTimestamp(format!("{s}: {e}")))
}

/// Frame parser.
#[derive(Debug, Clone)]
pub struct FrameParser {
    default_duration_seconds: i64,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new(DEFAULT_ROUND_DURATION_SECONDS)
    }
}

impl FrameParser {
    pub fn new(default_duration_seconds: i64) -> Self {
        Self {
            default_duration_seconds: default_duration_seconds.max(1),
        }
    }

    /// Convert a frame into an event.
    ///
    /// Returns `Ok(None)` for transport-only frames (pong).
    pub fn parse(&self, frame: InboundFrame) -> FeedResult<Option<RoundEvent>> {
        let event = match frame {
            InboundFrame::RoundStart { data } => RoundEvent::LifecycleStart(self.round_start(data)?),
            InboundFrame::PriceTick { data } => RoundEvent::PriceTick(price_tick(data)?),
            InboundFrame::RoundEnd { data } => RoundEvent::LifecycleEnd(round_end(data)?),
            InboundFrame::NoRound { message } => RoundEvent::NoActiveRound { message },
            InboundFrame::BetsUpdate { data } => RoundEvent::BetsUpdate(data),
            InboundFrame::Error { message } => RoundEvent::ServerError { message },
            InboundFrame::Pong => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Parse raw frame text.
    pub fn parse_text(&self, text: &str) -> FeedResult<Option<RoundEvent>> {
        let frame: InboundFrame = serde_json::from_str(text)?;
        self.parse(frame)
    }

    fn round_start(&self, data: RoundStartPayload) -> FeedResult<RoundStart> {
        if !data.open_price.is_positive() {
            return Err(FeedError::InvalidData(format!(
                "round {} open_price must be positive, got {}",
                data.id, data.open_price
            )));
        }

        let start_time_ms = parse_iso_ms(&data.start_time)?;
        let parsed_end = parse_iso_ms(&data.end_time)?;

        let (end_time_ms, total_duration_seconds) = if parsed_end > start_time_ms {
            // Partial seconds round up so the end stays inside the range.
            let total = (parsed_end - start_time_ms + 999) / 1000;
            (parsed_end, total)
        } else {
            warn!(
                id = %data.id,
                start = %data.start_time,
                end = %data.end_time,
                "Round end precedes start, using default duration"
            );
            let total = self.default_duration_seconds;
            (start_time_ms + total * 1000, total)
        };

        let current_price = data
            .current_price
            .filter(|p| p.is_positive())
            .unwrap_or(data.open_price);

        let remaining_seconds = data
            .remaining_seconds
            .unwrap_or(total_duration_seconds)
            .clamp(0, total_duration_seconds);

        let history: Vec<PriceSnapshot> = data
            .price_history
            .into_iter()
            .filter(|s| s.price.is_positive())
            .map(PriceSnapshot::from)
            .collect();

        debug!(
            id = %data.id,
            symbol = %data.symbol,
            total_duration_seconds,
            remaining_seconds,
            seed = history.len(),
            "Parsed round_start"
        );

        Ok(RoundStart {
            id: data.id,
            symbol: data.symbol,
            display_name: data.display_name,
            open_price: data.open_price,
            current_price,
            price_change_percent: data.price_change_percent,
            start_time_ms,
            end_time_ms,
            total_duration_seconds,
            remaining_seconds,
            status: data.status,
            bet_count: data.bet_count.unwrap_or(0),
            history,
        })
    }
}

fn price_tick(data: PriceTickPayload) -> FeedResult<PriceTick> {
    if !data.price.is_positive() {
        return Err(FeedError::InvalidData(format!(
            "tick price must be positive, got {}",
            data.price
        )));
    }
    Ok(PriceTick {
        price: data.price,
        timestamp_ms: data.timestamp,
        change_percent: data.change_percent,
        remaining_seconds: data.remaining_seconds.max(0),
        round_id: data.round_id,
        symbol: data.symbol,
    })
}

fn round_end(data: RoundEndPayload) -> FeedResult<RoundEnd> {
    if !data.close_price.is_positive() {
        return Err(FeedError::InvalidData(format!(
            "round {} close_price must be positive, got {}",
            data.id, data.close_price
        )));
    }
    Ok(RoundEnd {
        id: data.id,
        outcome: data.result,
        close_price: data.close_price,
        price_change_percent: data.price_change_percent,
        symbol: data.symbol,
    })
}
