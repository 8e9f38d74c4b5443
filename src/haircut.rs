/// Haircut applied to any product missing from [`HAIRCUTS`].
pub const DEFAULT_HAIRCUT: f64 = 0.25;

/// Product → haircut fraction. Keys are lowercase; both the sheet vocabulary
/// and English names are listed.
const HAIRCUTS: &[(&str, f64)] = &[
    ("fruta", 0.15),
    ("fruit", 0.15),
    ("vino", 0.20),
    ("wine", 0.20),
    ("otro", 0.30),
    ("other", 0.30),
];

pub fn haircut_for(product: &str) -> f64 {
    let key = product.trim().to_lowercase();
    HAIRCUTS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, h)| *h)
        .unwrap_or(DEFAULT_HAIRCUT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapped_products() {
        assert_eq!(haircut_for("Fruta"), 0.15);
        assert_eq!(haircut_for("Wine"), 0.20);
        assert_eq!(haircut_for(" otro "), 0.30);
    }

    #[test]
    fn test_unmapped_products_get_default() {
        for product in ["Salmón", "Cobre", "", "Fruits"] {
            assert_eq!(haircut_for(product), DEFAULT_HAIRCUT, "product {product:?}");
        }
    }
}
