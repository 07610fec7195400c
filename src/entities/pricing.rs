// 💲 Pricing records - canvas_size.csv and product_size.csv

use serde::{Deserialize, Serialize};

/// Canvas dimensions. `height` is blank for square labels that only list
/// one side, so the label string stays the human-facing identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasSize {
    pub size_id: i64,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub label: String,
}

impl CanvasSize {
    /// Width × height when both sides are recorded.
    pub fn area(&self) -> Option<i64> {
        Some(self.width? * self.height?)
    }
}

/// Price point for one (work, canvas size) pairing. The upstream extract
/// expects sale ≤ regular but does not enforce it, and it repeats whole
/// rows; the logical key is (work_id, size_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSize {
    pub work_id: i64,
    pub size_id: i64,
    pub sale_price: f64,
    pub regular_price: f64,
}

impl ProductSize {
    /// Sale price strictly below half the regular price.
    pub fn is_deeply_discounted(&self) -> bool {
        self.sale_price < self.regular_price / 2.0
    }

    /// The expected invariant broken: sale price above regular price.
    pub fn is_price_inverted(&self) -> bool {
        self.sale_price > self.regular_price
    }

    /// Fraction of the regular price knocked off, 0.0 when regular is 0.
    pub fn discount_fraction(&self) -> f64 {
        if self.regular_price == 0.0 {
            return 0.0;
        }
        1.0 - self.sale_price / self.regular_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(sale: f64, regular: f64) -> ProductSize {
        ProductSize {
            work_id: 124,
            size_id: 24,
            sale_price: sale,
            regular_price: regular,
        }
    }

    #[test]
    fn test_deep_discount() {
        assert!(price(10.0, 85.0).is_deeply_discounted());
        assert!(!price(45.0, 85.0).is_deeply_discounted());
    }

    #[test]
    fn test_price_inversion() {
        assert!(price(95.0, 85.0).is_price_inverted());
        assert!(!price(85.0, 85.0).is_price_inverted());
    }

    #[test]
    fn test_discount_fraction() {
        let p = price(42.5, 85.0);
        assert!((p.discount_fraction() - 0.5).abs() < 1e-9);
        assert_eq!(price(10.0, 0.0).discount_fraction(), 0.0);
    }

    #[test]
    fn test_canvas_area() {
        let canvas = CanvasSize {
            size_id: 2436,
            width: Some(24),
            height: Some(36),
            label: "24\" x 36\"".to_string(),
        };
        assert_eq!(canvas.area(), Some(864));

        let square = CanvasSize {
            size_id: 30,
            width: Some(30),
            height: None,
            label: "30\"".to_string(),
        };
        assert_eq!(square.area(), None);
    }
}
