use crate::models::MasterTable;

/// Code prefixes that always mean an affiliate placement.
pub const AFFILIATE_PREFIXES: &[&str] = &["GEN", "AFA", "AFP", "RAA"];

pub const AFFILIATE: &str = "Affiliate";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub media: String,
    pub category: String,
}

fn is_affiliate_code(code: &str) -> bool {
    AFFILIATE_PREFIXES.iter().any(|p| code.starts_with(p))
}

/// Resolve an ad code to its (media, category).
///
/// Prefix rules win over the master table; a code matched by neither is
/// unclassified and the caller drops it.
pub fn classify(code: &str, master: &MasterTable) -> Option<Classification> {
    if is_affiliate_code(code) {
        return Some(Classification {
            media: AFFILIATE.to_string(),
            category: AFFILIATE.to_string(),
        });
    }
    master.get(code).map(|(media, category)| Classification {
        media: media.to_string(),
        category: category.to_string(),
    })
}
