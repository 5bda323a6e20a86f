use serde::{Deserialize, Deserializer, Serialize};

/// One element of an input file's JSON array.
/// Missing and `null` fields decode to their zero value; zero values are omitted on output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "is_zero")]
    pub age: i64,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "is_zero")]
    pub role: i64,
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(d).map(Option::unwrap_or_default)
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

impl Record {
    pub fn new(name: impl Into<String>, age: i64, role: i64) -> Self {
        Self { name: name.into(), age, role }
    }
}
