//! BER-TLV codec for command data and on-card objects.
//!
//! Parsing and serialization are delegated to the `iso7816-tlv` crate; this
//! module adds the operations the protocols need on top of single data
//! objects: parsing a concatenation of objects, byte-exact serialization of a
//! sequence, and tag search (one level deep or recursive).

pub use iso7816_tlv::ber::{Tag, Tlv, Value};
pub use iso7816_tlv::TlvError;

/// Well-known BER-TLV tags of TR-03110 structures.
pub mod tags {
    pub const INTEGER: &[u8] = &[0x02];
    pub const OID: &[u8] = &[0x06];
    pub const SEQUENCE: &[u8] = &[0x30];
    pub const CAR: &[u8] = &[0x42];
    pub const DISCRETIONARY_DATA: &[u8] = &[0x53];
    pub const CHR: &[u8] = &[0x5F, 0x20];
    pub const EXPIRATION_DATE: &[u8] = &[0x5F, 0x24];
    pub const EFFECTIVE_DATE: &[u8] = &[0x5F, 0x25];
    pub const PROFILE_IDENTIFIER: &[u8] = &[0x5F, 0x29];
    pub const SIGNATURE: &[u8] = &[0x5F, 0x37];
    pub const CV_CERTIFICATE: &[u8] = &[0x7F, 0x21];
    pub const CHAT: &[u8] = &[0x7F, 0x4C];
    pub const PUBLIC_KEY: &[u8] = &[0x7F, 0x49];
    pub const CERTIFICATE_BODY: &[u8] = &[0x7F, 0x4E];
    pub const DYNAMIC_AUTH_TEMPLATE: &[u8] = &[0x7C];

    // Context tags inside templates (0x80 | n, primitive).
    pub const CONTEXT_0: &[u8] = &[0x80];
    pub const CONTEXT_1: &[u8] = &[0x81];
    pub const CONTEXT_2: &[u8] = &[0x82];
    pub const CONTEXT_3: &[u8] = &[0x83];
    pub const CONTEXT_4: &[u8] = &[0x84];
    pub const CONTEXT_5: &[u8] = &[0x85];
    pub const CONTEXT_6: &[u8] = &[0x86];
    pub const CONTEXT_7: &[u8] = &[0x87];
}

/// Builds a [Tag] from a constant byte encoding.
///
/// Panics on invalid encodings: every call site passes a compile-time tag
/// constant, so a failure is an invariant violation, not runtime input.
pub fn tag(bytes: &[u8]) -> Tag {
    let number = bytes.iter().fold(0usize, |acc, byte| (acc << 8) | usize::from(*byte));
    Tag::try_from(number).expect("tag constants are valid BER tags")
}

/// Builds a primitive data object.
pub fn prim(tag_bytes: &[u8], value: &[u8]) -> Tlv {
    Tlv::new(tag(tag_bytes), Value::Primitive(value.to_vec())).expect("primitive tag with primitive value")
}

/// Builds a constructed data object.
pub fn cons(tag_bytes: &[u8], children: Vec<Tlv>) -> Tlv {
    Tlv::new(tag(tag_bytes), Value::Constructed(children)).expect("constructed tag with constructed value")
}

/// Parses a concatenation of BER-TLV data objects.
///
/// Fails on truncated length fields, inconsistent nesting or trailing
/// garbage; empty input yields an empty sequence.
pub fn parse(mut input: &[u8]) -> Result<Vec<Tlv>, TlvError> {
    let mut objects = Vec::new();
    while !input.is_empty() {
        let (parsed, rest) = Tlv::parse(input);
        objects.push(parsed?);
        input = rest;
    }
    Ok(objects)
}

/// Serializes a sequence of data objects; round-trips byte-exact with
/// [parse] for any input [parse] accepted.
pub fn serialize(objects: &[Tlv]) -> Vec<u8> {
    let mut encoded = Vec::new();
    for object in objects {
        encoded.extend(object.to_vec());
    }
    encoded
}

/// Returns the first object with the given tag, one level deep.
pub fn find_first<'a>(objects: &'a [Tlv], tag_bytes: &[u8]) -> Option<&'a Tlv> {
    let wanted = tag(tag_bytes);
    objects.iter().find(|object| object.tag() == &wanted)
}

/// Returns all objects with the given tag, one level deep.
pub fn find_all<'a>(objects: &'a [Tlv], tag_bytes: &[u8]) -> Vec<&'a Tlv> {
    let wanted = tag(tag_bytes);
    objects.iter().filter(|object| object.tag() == &wanted).collect()
}

/// Returns all objects with the given tag, descending into constructed
/// values depth-first. Matching objects are not descended into further.
pub fn find_recursive<'a>(objects: &'a [Tlv], tag_bytes: &[u8]) -> Vec<&'a Tlv> {
    let wanted = tag(tag_bytes);
    let mut matches = Vec::new();
    collect_recursive(objects, &wanted, &mut matches);
    matches
}

fn collect_recursive<'a>(objects: &'a [Tlv], wanted: &Tag, matches: &mut Vec<&'a Tlv>) {
    for object in objects {
        if object.tag() == wanted {
            matches.push(object);
        } else if let Value::Constructed(children) = object.value() {
            collect_recursive(children, wanted, matches);
        }
    }
}

/// The value of a primitive data object, or `None` for constructed ones.
pub fn primitive_value(object: &Tlv) -> Option<&[u8]> {
    match object.value() {
        Value::Primitive(bytes) => Some(bytes),
        Value::Constructed(_) => None,
    }
}

/// The children of a constructed data object, or `None` for primitive ones.
pub fn children(object: &Tlv) -> Option<&[Tlv]> {
    match object.value() {
        Value::Primitive(_) => None,
        Value::Constructed(children) => Some(children),
    }
}

#[cfg(test)]
mod tests {
    use proptest::collection;
    use proptest::prelude::*;

    use super::*;

    fn arb_tlv() -> impl Strategy<Value = Tlv> {
        let leaf = (0u8..16, collection::vec(any::<u8>(), 0..48))
            .prop_map(|(tag_nibble, value)| prim(&[0x80 | tag_nibble], &value));
        leaf.prop_recursive(3, 24, 4, |inner| {
            (0u8..16, collection::vec(inner, 0..4))
                .prop_map(|(tag_nibble, objects)| cons(&[0xA0 | tag_nibble], objects))
        })
    }

    proptest! {
        #[test]
        fn serializer_output_reparses_identically(objects in collection::vec(arb_tlv(), 0..4)) {
            let encoded = serialize(&objects);
            let reparsed = parse(&encoded).expect("serializer output must parse");
            prop_assert_eq!(encoded, serialize(&reparsed));
        }
    }

    #[test]
    fn accepted_input_reserializes_byte_exact() {
        let input = [
            0x7C, 0x0C, // dynamic authentication template
            0x80, 0x04, 0xDE, 0xAD, 0xBE, 0xEF, // nonce
            0x81, 0x04, 0x01, 0x02, 0x03, 0x04, // mapping data
            0x02, 0x01, 0x2A, // trailing primitive sibling
        ];
        let objects = parse(&input).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(serialize(&objects), input);
    }

    #[test]
    fn truncated_length_field_is_rejected() {
        assert!(parse(&[0x7C, 0x10, 0x80, 0x01]).is_err());
        assert!(parse(&[0x5F]).is_err());
    }

    #[test]
    fn empty_input_parses_to_empty_sequence() {
        assert!(parse(&[]).unwrap().is_empty());
    }

    #[test]
    fn find_is_one_level_deep_unless_recursive() {
        let input = [
            0x7C, 0x06, 0x80, 0x01, 0xAA, 0x81, 0x01, 0xBB, //
            0x80, 0x01, 0xCC,
        ];
        let objects = parse(&input).unwrap();

        // Top level sees only the outer 0x80.
        let top = find_first(&objects, tags::CONTEXT_0).unwrap();
        assert_eq!(primitive_value(top), Some(&[0xCC][..]));
        assert_eq!(find_all(&objects, tags::CONTEXT_0).len(), 1);

        // Recursive search also reaches the nested one.
        let all = find_recursive(&objects, tags::CONTEXT_0);
        assert_eq!(all.len(), 2);
        assert_eq!(primitive_value(all[0]), Some(&[0xAA][..]));
    }

    #[test]
    fn tag_helper_builds_single_and_multi_byte_tags() {
        let single = prim(tags::OID, &[0x2A]);
        assert!(single.to_vec().starts_with(tags::OID));
        let two_byte = prim(tags::CHR, b"DETEST00001");
        assert!(two_byte.to_vec().starts_with(tags::CHR));
        let constructed = cons(tags::PUBLIC_KEY, vec![prim(tags::OID, &[0x2A])]);
        assert!(constructed.to_vec().starts_with(tags::PUBLIC_KEY));
    }

    #[test]
    fn multi_byte_tags_round_trip() {
        let object = cons(
            tags::PUBLIC_KEY,
            vec![prim(tags::OID, &[0x2A]), prim(tags::CONTEXT_6, &[0x04, 0x01, 0x02])],
        );
        let encoded = serialize(&[object]);
        assert_eq!(encoded[0], 0x7F);
        assert_eq!(encoded[1], 0x49);
        let reparsed = parse(&encoded).unwrap();
        assert_eq!(serialize(&reparsed), encoded);
    }
}
