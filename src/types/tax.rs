//! Tax-inspection results

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Buy/sell transfer tax of a token, in percent (5 = 5%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxQuote {
    pub buy_tax_pct: Decimal,
    pub sell_tax_pct: Decimal,
    pub is_honeypot: bool,
}
