// used for `#[serde(skip_serializing_if = "is_false")]` attrs
#[inline]
pub(crate) fn is_false(b: &bool) -> bool {
    !*b
}

/// The REST API encodes 64 bit integers as json strings, but numbers do show up
/// in a few places, so both are accepted when deserializing.
pub(crate) mod int64 {
    use std::fmt;
    use std::marker::PhantomData;
    use std::str::FromStr;

    use serde::de;

    struct IntVisitor<T>(PhantomData<T>);

    impl<'de, T> de::Visitor<'de> for IntVisitor<T>
    where
        T: FromStr + TryFrom<i64> + TryFrom<u64>,
        <T as FromStr>::Err: fmt::Display,
    {
        type Value = T;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an integer, or a string containing an integer")
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            T::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            T::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            v.trim().parse::<T>().map_err(E::custom)
        }
    }

    pub(crate) mod optional {
        use std::fmt;
        use std::marker::PhantomData;
        use std::str::FromStr;

        pub(crate) fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
        where
            T: fmt::Display,
            S: serde::Serializer,
        {
            match value {
                Some(value) => serializer.collect_str(value),
                None => serializer.serialize_none(),
            }
        }

        pub(crate) fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
        where
            D: serde::Deserializer<'de>,
            T: FromStr + TryFrom<i64> + TryFrom<u64>,
            <T as FromStr>::Err: fmt::Display,
        {
            struct OptionVisitor<T>(PhantomData<T>);

            impl<'de, T> serde::de::Visitor<'de> for OptionVisitor<T>
            where
                T: FromStr + TryFrom<i64> + TryFrom<u64>,
                <T as FromStr>::Err: fmt::Display,
            {
                type Value = Option<T>;

                fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                    formatter.write_str("an optional integer")
                }

                fn visit_none<E>(self) -> Result<Self::Value, E>
                where
                    E: serde::de::Error,
                {
                    Ok(None)
                }

                fn visit_unit<E>(self) -> Result<Self::Value, E>
                where
                    E: serde::de::Error,
                {
                    Ok(None)
                }

                fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
                where
                    D: serde::Deserializer<'de>,
                {
                    deserializer
                        .deserialize_any(super::IntVisitor(PhantomData))
                        .map(Some)
                }
            }

            deserializer.deserialize_option(OptionVisitor(PhantomData))
        }
    }
}

#[cfg(test)]
mod tests {
    #[derive(Debug, serde::Deserialize, serde::Serialize)]
    struct Wrapper {
        #[serde(default, with = "super::int64::optional")]
        value: Option<u64>,
    }

    #[test]
    fn test_int64_string_or_number() {
        let from_str: Wrapper = serde_json::from_str(r#"{"value": "42"}"#).unwrap();
        let from_num: Wrapper = serde_json::from_str(r#"{"value": 42}"#).unwrap();
        let missing: Wrapper = serde_json::from_str("{}").unwrap();
        let null: Wrapper = serde_json::from_str(r#"{"value": null}"#).unwrap();

        assert_eq!(from_str.value, Some(42));
        assert_eq!(from_num.value, Some(42));
        assert_eq!(missing.value, None);
        assert_eq!(null.value, None);

        assert_eq!(
            serde_json::to_string(&from_str).unwrap(),
            r#"{"value":"42"}"#
        );
    }
}
