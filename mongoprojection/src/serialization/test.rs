mod builder {
    use crate::{
        expr::Type,
        serialization::{Decoder, DocumentDecoder},
    };

    #[test]
    fn creator_defaults_to_member_order() {
        let decoder = DocumentDecoder::builder("Point")
            .member("X", "x", Decoder::Value(Type::Double))
            .member("Y", "y", Decoder::Value(Type::Double))
            .build();
        assert_eq!(vec!["X".to_string(), "Y".to_string()], decoder.creator());
    }

    #[test]
    fn explicit_creator_order_is_kept() {
        let decoder = DocumentDecoder::builder("Point")
            .member("X", "x", Decoder::Value(Type::Double))
            .member("Y", "y", Decoder::Value(Type::Double))
            .creator_parameter("Y")
            .creator_parameter("X")
            .build();
        assert_eq!(vec!["Y".to_string(), "X".to_string()], decoder.creator());
    }

    #[test]
    fn redeclared_member_keeps_position() {
        let decoder = DocumentDecoder::builder("Point")
            .member("X", "x", Decoder::Value(Type::Double))
            .member("Y", "y", Decoder::Value(Type::Double))
            .member("X", "x2", Decoder::Value(Type::Int32))
            .build();
        let members: Vec<(&str, &str)> = decoder
            .members()
            .map(|(name, m)| (name.as_str(), m.element_name.as_str()))
            .collect();
        assert_eq!(vec![("X", "x2"), ("Y", "y")], members);
    }
}

mod registry {
    use crate::{
        expr::Type,
        fixtures::*,
        serialization::{Decoder, DecoderRegistry, StandardDecoderRegistry},
    };

    #[test]
    fn scalars_are_known_without_registration() {
        let registry = StandardDecoderRegistry::new();
        assert_eq!(
            Some(Decoder::Value(Type::Decimal128)),
            registry.lookup(&Type::Decimal128)
        );
    }

    #[test]
    fn collections_are_derived_from_items() {
        assert_eq!(
            Some(Decoder::array(Decoder::nullable(Decoder::Value(Type::Int32)))),
            REGISTRY.lookup(&Type::set(Type::nullable(Type::Int32)))
        );
        assert_eq!(
            Some(Decoder::array(ITEM_DECODER.clone().into())),
            REGISTRY.lookup(&Type::array(item_type()))
        );
    }

    #[test]
    fn unregistered_class_misses() {
        assert_eq!(None, StandardDecoderRegistry::new().lookup(&order_type()));
        assert_eq!(None, REGISTRY.lookup(&Type::array(Type::class("Unknown"))));
    }

    #[test]
    fn register_replaces_by_type_name() {
        let mut registry = StandardDecoderRegistry::new().with_class(ORDER_DECODER.clone());
        let replaced = registry.register(ORDER_DECODER.clone());
        assert_eq!(Some(ORDER_DECODER.clone()), replaced);
    }
}

mod decode {
    use crate::{
        expr::Type,
        fixtures::*,
        serialization::{Composite, DecodeError, Decoder, DocumentDecoder, Value},
    };
    use bson::{bson, spec::ElementType, Bson};

    fn item() -> Decoder {
        ITEM_DECODER.clone().into()
    }

    #[test]
    fn composite_arguments_follow_creator_order() {
        let decoder: Decoder = DocumentDecoder::builder("Line")
            .member("Name", "n", Decoder::Value(Type::String))
            .member("Qty", "q", Decoder::Value(Type::Int32))
            .creator_parameter("Qty")
            .creator_parameter("Name")
            .build()
            .into();
        assert_eq!(
            Ok(Value::Composite(Composite {
                type_name: "Line".to_string(),
                arguments: vec![
                    ("Qty".to_string(), Value::Int32(3)),
                    ("Name".to_string(), Value::String("pen".to_string())),
                ],
            })),
            decoder.decode(&bson!({ "n": "pen", "q": 3 }))
        );
    }

    #[test]
    fn nested_documents_and_arrays() {
        let decoder = Decoder::array(item());
        let decoded = decoder
            .decode(&bson!([{ "Name": "a", "Quantity": 1 }, { "Name": "b", "Quantity": 2 }]))
            .unwrap();
        match decoded {
            Value::Array(items) => {
                assert_eq!(2, items.len());
                match &items[1] {
                    Value::Composite(c) => {
                        assert_eq!(Some(&Value::String("b".to_string())), c.get("Name"))
                    }
                    other => panic!("expected a composite, found {other:?}"),
                }
            }
            other => panic!("expected an array, found {other:?}"),
        }
    }

    #[test]
    fn null_document_decodes_to_null() {
        assert_eq!(Ok(Value::Null), item().decode(&Bson::Null));
    }

    #[test]
    fn nullable_scalar_accepts_null() {
        let decoder = Decoder::nullable(Decoder::Value(Type::Double));
        assert_eq!(Ok(Value::Null), decoder.decode(&Bson::Null));
        assert_eq!(Ok(Value::Double(1.5)), decoder.decode(&Bson::Double(1.5)));
    }

    #[test]
    fn integers_widen_to_double_and_long() {
        assert_eq!(
            Ok(Value::Double(2.0)),
            Decoder::Value(Type::Double).decode(&Bson::Int32(2))
        );
        assert_eq!(
            Ok(Value::Int64(2)),
            Decoder::Value(Type::Int64).decode(&Bson::Int32(2))
        );
    }

    #[test]
    fn integral_double_narrows_to_int() {
        assert_eq!(
            Ok(Value::Int32(4)),
            Decoder::Value(Type::Int32).decode(&Bson::Double(4.0))
        );
    }

    #[test]
    fn lossy_narrowing_is_out_of_range() {
        assert_eq!(
            Err(DecodeError::OutOfRange {
                value: "4.5".to_string(),
                ty: Type::Int32,
            }),
            Decoder::Value(Type::Int32).decode(&Bson::Double(4.5))
        );
        assert_eq!(
            Err(DecodeError::OutOfRange {
                value: i64::MAX.to_string(),
                ty: Type::Int32,
            }),
            Decoder::Value(Type::Int32).decode(&Bson::Int64(i64::MAX))
        );
    }

    #[test]
    fn missing_element_is_an_error() {
        assert_eq!(
            Err(DecodeError::MissingElement {
                type_name: "Item".to_string(),
                element: "Quantity".to_string(),
            }),
            item().decode(&bson!({ "Name": "a" }))
        );
    }

    #[test]
    fn type_mismatch_names_found_element_type() {
        assert_eq!(
            Err(DecodeError::TypeMismatch {
                expected: Type::String,
                found: ElementType::Int32,
            }),
            Decoder::Value(Type::String).decode(&Bson::Int32(1))
        );
    }

    #[test]
    fn creator_parameter_without_member_is_an_error() {
        let decoder = DocumentDecoder::builder("Broken")
            .member("A", "a", Decoder::Value(Type::Int32))
            .creator_parameter("B")
            .build();
        assert_eq!(
            Err(DecodeError::UnknownCreatorParameter {
                type_name: "Broken".to_string(),
                parameter: "B".to_string(),
            }),
            decoder.decode(&bson!({ "a": 1 }))
        );
    }
}
