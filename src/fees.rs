// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! # Fee Calculator
//!
//! Deterministic INR breakdown for a USD amount at a given FX rate. All
//! arithmetic is exact `Decimal`; rounding happens only when values are
//! serialized at the API boundary, never mid-calculation.
//!
//! ```text
//! gross_inr    = amount_usd * fx_rate
//! tds          = gross_inr * 1%          (withheld on gross)
//! platform_fee = gross_inr * 0.7%
//! gst          = platform_fee * 18%      (on the fee only, not on gross)
//! net_inr      = gross_inr - tds - platform_fee - gst
//! ```

use rust_decimal::Decimal;

/// 1% TDS on gross.
const TDS_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);
/// 0.7% platform commission on gross.
const PLATFORM_FEE_RATE: Decimal = Decimal::from_parts(7, 0, 0, false, 3);
/// 18% GST on the platform fee.
const GST_RATE: Decimal = Decimal::from_parts(18, 0, 0, false, 2);

/// Exact fee breakdown for one quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub gross_inr: Decimal,
    pub tds: Decimal,
    pub platform_fee: Decimal,
    pub gst: Decimal,
    pub net_inr: Decimal,
}

/// Compute the INR breakdown for `amount_usd` at `fx_rate`.
///
/// Infallible for positive finite inputs; callers validate positivity at
/// the API layer. For positive inputs every component is non-negative and
/// `net_inr < gross_inr`.
pub fn quote_breakdown(amount_usd: Decimal, fx_rate: Decimal) -> FeeBreakdown {
    let gross_inr = amount_usd * fx_rate;
    let tds = gross_inr * TDS_RATE;
    let platform_fee = gross_inr * PLATFORM_FEE_RATE;
    let gst = platform_fee * GST_RATE;
    let net_inr = gross_inr - tds - platform_fee - gst;

    FeeBreakdown {
        gross_inr,
        tds,
        platform_fee,
        gst,
        net_inr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    #[test]
    fn worked_example_is_exact() {
        // 100 USD at 83.65: the reference arithmetic, asserted exactly.
        let breakdown = quote_breakdown(dec("100"), dec("83.65"));
        assert_eq!(breakdown.gross_inr, dec("8365.00"));
        assert_eq!(breakdown.tds, dec("83.65"));
        assert_eq!(breakdown.platform_fee, dec("58.555"));
        assert_eq!(breakdown.gst, dec("10.5399"));
        assert_eq!(breakdown.net_inr, dec("8212.2551"));
    }

    #[test]
    fn net_is_gross_minus_all_components() {
        let breakdown = quote_breakdown(dec("37.42"), dec("82.1135"));
        assert_eq!(
            breakdown.net_inr,
            breakdown.gross_inr - breakdown.tds - breakdown.platform_fee - breakdown.gst
        );
    }

    #[test]
    fn net_is_strictly_below_gross_for_positive_inputs() {
        for (amount, rate) in [("0.01", "83.65"), ("1", "1"), ("250000", "79.9999")] {
            let breakdown = quote_breakdown(dec(amount), dec(rate));
            assert!(breakdown.net_inr < breakdown.gross_inr, "{amount} @ {rate}");
            assert!(breakdown.net_inr > Decimal::ZERO);
            assert!(breakdown.tds >= Decimal::ZERO);
            assert!(breakdown.platform_fee >= Decimal::ZERO);
            assert!(breakdown.gst >= Decimal::ZERO);
        }
    }

    #[test]
    fn gst_applies_to_fee_not_gross() {
        let breakdown = quote_breakdown(dec("1000"), dec("80"));
        assert_eq!(breakdown.gst, breakdown.platform_fee * dec("0.18"));
    }
}
