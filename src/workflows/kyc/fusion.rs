use super::domain::{DocumentSlots, IdentityData};

/// Address-proof fields copied only when the identity document has not supplied them.
const ADDRESS_FALLBACK_FIELDS: [&str; 2] = ["name", "address"];

/// Address-proof fields that always reflect the latest proof, stored under a prefixed key.
const ADDRESS_OWNED_FIELDS: [(&str, &str); 2] = [
    ("issue_date", "address_issue_date"),
    ("provider", "address_provider"),
];

/// Merge the extracted fields of both document slots into the identity view.
///
/// Existing values are kept unless a document overwrites them: identity-document fields always
/// win, while the address proof only fills gaps for `name`/`address` and owns the
/// `address_issue_date`/`address_provider` keys. Applying it twice yields the same result.
pub fn fuse(existing: &IdentityData, documents: &DocumentSlots) -> IdentityData {
    let mut fused = existing.clone();

    if let Some(id_document) = &documents.id_document {
        fused.extend(
            id_document
                .extracted_fields
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
    }

    if let Some(address_proof) = &documents.address_proof {
        let fields = &address_proof.extracted_fields;

        for key in ADDRESS_FALLBACK_FIELDS {
            if let Some(value) = fields.get(key) {
                fused
                    .entry(key.to_string())
                    .or_insert_with(|| value.clone());
            }
        }

        for (source, target) in ADDRESS_OWNED_FIELDS {
            if let Some(value) = fields.get(source) {
                fused.insert(target.to_string(), value.clone());
            }
        }
    }

    fused
}
