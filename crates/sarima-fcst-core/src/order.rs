//! SARIMA orders and the candidate grid.

use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// Non-seasonal order (p, d, q).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Order {
    /// AR order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// MA order
    pub q: usize,
}

/// Seasonal order (P, D, Q, s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SeasonalOrder {
    /// Seasonal AR order
    pub p: usize,
    /// Seasonal differencing order
    pub d: usize,
    /// Seasonal MA order
    pub q: usize,
    /// Season length in observations
    pub period: usize,
}

/// One point of the search grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct OrderCandidate {
    pub order: Order,
    pub seasonal: SeasonalOrder,
}

impl Order {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

impl SeasonalOrder {
    pub fn new(p: usize, d: usize, q: usize, period: usize) -> Self {
        Self { p, d, q, period }
    }

    /// Whether any seasonal term is active.
    pub fn is_active(&self) -> bool {
        self.p > 0 || self.d > 0 || self.q > 0
    }
}

impl OrderCandidate {
    pub fn new(order: Order, seasonal: SeasonalOrder) -> Self {
        Self { order, seasonal }
    }

    /// Number of ARMA coefficients (excludes the innovation variance).
    pub fn num_coefficients(&self) -> usize {
        self.order.p + self.order.q + self.seasonal.p + self.seasonal.q
    }

    /// Largest lag of the differencing polynomial.
    pub fn differencing_lags(&self) -> usize {
        self.order.d + self.seasonal.d * self.seasonal.period
    }

    /// Largest lag of the combined AR polynomial (excluding differencing).
    pub fn ar_lags(&self) -> usize {
        self.order.p + self.seasonal.p * self.seasonal.period
    }

    /// Largest lag of the combined MA polynomial.
    pub fn ma_lags(&self) -> usize {
        self.order.q + self.seasonal.q * self.seasonal.period
    }

    /// Observations consumed before the first residual: AR plus differencing lags.
    pub fn conditioning_lags(&self) -> usize {
        self.ar_lags() + self.differencing_lags()
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.p, self.d, self.q)
    }
}

impl fmt::Display for SeasonalOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.p, self.d, self.q, self.period)
    }
}

impl fmt::Display for OrderCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SARIMAX{}x{}", self.order, self.seasonal)
    }
}

/// Half-open ranges for the three components of an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRanges {
    pub p: Range<usize>,
    pub d: Range<usize>,
    pub q: Range<usize>,
}

impl OrderRanges {
    pub fn new(p: Range<usize>, d: Range<usize>, q: Range<usize>) -> Self {
        Self { p, d, q }
    }

    /// Cartesian product with `p` varying slowest and `q` fastest.
    pub fn triples(&self) -> Vec<(usize, usize, usize)> {
        let mut out = Vec::new();
        for p in self.p.clone() {
            for d in self.d.clone() {
                for q in self.q.clone() {
                    out.push((p, d, q));
                }
            }
        }
        out
    }
}

impl Default for OrderRanges {
    fn default() -> Self {
        Self::new(0..4, 0..2, 0..2)
    }
}

/// The full search space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderGrid {
    /// Non-seasonal component ranges
    pub non_seasonal: OrderRanges,
    /// Seasonal component ranges
    pub seasonal: OrderRanges,
    /// Fixed season length
    pub period: usize,
}

impl Default for OrderGrid {
    fn default() -> Self {
        Self {
            non_seasonal: OrderRanges::default(),
            seasonal: OrderRanges::default(),
            period: 12,
        }
    }
}

impl OrderGrid {
    /// All non-seasonal orders in enumeration order.
    pub fn orders(&self) -> Vec<Order> {
        self.non_seasonal
            .triples()
            .into_iter()
            .map(|(p, d, q)| Order::new(p, d, q))
            .collect()
    }

    /// All seasonal orders in enumeration order.
    pub fn seasonal_orders(&self) -> Vec<SeasonalOrder> {
        self.seasonal
            .triples()
            .into_iter()
            .map(|(p, d, q)| SeasonalOrder::new(p, d, q, self.period))
            .collect()
    }

    /// Every candidate: non-seasonal order outer, seasonal order inner.
    pub fn candidates(&self) -> Vec<OrderCandidate> {
        let seasonal = self.seasonal_orders();
        self.orders()
            .into_iter()
            .flat_map(|order| {
                seasonal
                    .iter()
                    .map(move |s| OrderCandidate::new(order, *s))
            })
            .collect()
    }

    /// A handful of sample combinations for display.
    pub fn examples(&self) -> Vec<OrderCandidate> {
        let orders = self.orders();
        let seasonal = self.seasonal_orders();
        [(1, 1), (1, 2), (2, 3), (2, 4)]
            .iter()
            .filter_map(|&(i, j)| Some(OrderCandidate::new(*orders.get(i)?, *seasonal.get(j)?)))
            .collect()
    }

    pub fn len(&self) -> usize {
        let n = |r: &OrderRanges| r.p.len() * r.d.len() * r.q.len();
        n(&self.non_seasonal) * n(&self.seasonal)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid_size() {
        let grid = OrderGrid::default();
        assert_eq!(grid.len(), 256);
        assert_eq!(grid.candidates().len(), 256);
    }

    #[test]
    fn test_enumeration_order() {
        let grid = OrderGrid::default();
        let candidates = grid.candidates();
        assert_eq!(
            candidates[0],
            OrderCandidate::new(Order::new(0, 0, 0), SeasonalOrder::new(0, 0, 0, 12))
        );
        assert_eq!(
            candidates[1],
            OrderCandidate::new(Order::new(0, 0, 0), SeasonalOrder::new(0, 0, 1, 12))
        );
        assert_eq!(
            candidates[16],
            OrderCandidate::new(Order::new(0, 0, 1), SeasonalOrder::new(0, 0, 0, 12))
        );
        assert_eq!(
            candidates[255],
            OrderCandidate::new(Order::new(3, 1, 1), SeasonalOrder::new(3, 1, 1, 12))
        );
    }

    #[test]
    fn test_examples_match_display_format() {
        let grid = OrderGrid::default();
        let shown: Vec<String> = grid
            .examples()
            .iter()
            .map(|c| format!("SARIMAX: {} x {}", c.order, c.seasonal))
            .collect();
        assert_eq!(
            shown,
            vec![
                "SARIMAX: (0, 0, 1) x (0, 0, 1, 12)",
                "SARIMAX: (0, 0, 1) x (0, 1, 0, 12)",
                "SARIMAX: (0, 1, 0) x (0, 1, 1, 12)",
                "SARIMAX: (0, 1, 0) x (1, 0, 0, 12)",
            ]
        );
    }

    #[test]
    fn test_candidate_lags() {
        let c = OrderCandidate::new(Order::new(2, 1, 1), SeasonalOrder::new(1, 1, 2, 12));
        assert_eq!(c.num_coefficients(), 6);
        assert_eq!(c.differencing_lags(), 13);
        assert_eq!(c.ar_lags(), 14);
        assert_eq!(c.ma_lags(), 25);
        assert_eq!(c.conditioning_lags(), 27);
        assert_eq!(c.to_string(), "SARIMAX(2, 1, 1)x(1, 1, 2, 12)");
    }
}
