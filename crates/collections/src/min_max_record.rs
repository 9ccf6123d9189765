use std::fmt;

#[derive(Debug, Clone)]
struct Inner<K, V> {
    min_key: K,
    min_value: V,
    max_key: K,
    max_value: V,
}

impl<K, V> Inner<K, V> {
    fn new(key: K, value: V) -> Self
    where
        K: Clone,
        V: Clone,
    {
        Self {
            min_key: key.clone(),
            min_value: value.clone(),
            max_key: key,
            max_value: value,
        }
    }
}

/// Tracks the keys with the lowest and highest score seen so far.
///
/// Ties keep the earlier key, and scores that do not compare (NaN) are
/// ignored, so a brute-force search over candidates is deterministic in
/// the order the candidates were tried.
#[derive(Debug, Clone)]
pub struct MinMaxRecord<K, V> {
    inner: Option<Inner<K, V>>,
}

impl<K, V> Default for MinMaxRecord<K, V> {
    fn default() -> Self {
        Self { inner: None }
    }
}

impl<K, V> MinMaxRecord<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    pub fn update(&mut self, key: K, value: V)
    where
        K: Clone,
        V: PartialOrd + Clone,
    {
        #[allow(clippy::eq_op)]
        if value.partial_cmp(&value).is_none() {
            return;
        }
        match &mut self.inner {
            None => {
                self.inner = Some(Inner::new(key, value));
            }
            Some(Inner {
                min_key,
                min_value,
                max_key,
                max_value,
            }) => {
                if value < *min_value {
                    *min_key = key;
                    *min_value = value;
                } else if value > *max_value {
                    *max_key = key;
                    *max_value = value;
                }
            }
        }
    }

    pub fn get_min(&self) -> Option<(&K, &V)> {
        let Inner {
            min_key, min_value, ..
        } = self.inner.as_ref()?;
        Some((min_key, min_value))
    }

    pub fn get_max(&self) -> Option<(&K, &V)> {
        let Inner {
            max_key, max_value, ..
        } = self.inner.as_ref()?;
        Some((max_key, max_value))
    }

    pub fn into_min(self) -> Option<(K, V)> {
        let Inner {
            min_key, min_value, ..
        } = self.inner?;
        Some((min_key, min_value))
    }

    pub fn into_max(self) -> Option<(K, V)> {
        let Inner {
            max_key, max_value, ..
        } = self.inner?;
        Some((max_key, max_value))
    }

    pub fn append(&mut self, other: &mut Self)
    where
        V: PartialOrd,
    {
        match (&mut self.inner, other.inner.take()) {
            (_, None) => {}
            (None, Some(inner)) => {
                self.inner = Some(inner);
            }
            (Some(this), Some(other)) => {
                if other.min_value < this.min_value {
                    this.min_key = other.min_key;
                    this.min_value = other.min_value;
                }
                if other.max_value > this.max_value {
                    this.max_key = other.max_key;
                    this.max_value = other.max_value;
                }
            }
        }
    }
}

impl<K, V> FromIterator<(K, V)> for MinMaxRecord<K, V>
where
    K: Clone,
    V: PartialOrd + Clone,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = Self::new();
        for (key, value) in iter {
            record.update(key, value);
        }
        record
    }
}

impl<K, V> fmt::Display for MinMaxRecord<K, V>
where
    K: fmt::Display,
    V: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(Inner {
                min_key,
                min_value,
                max_key,
                max_value,
            }) => write!(
                f,
                "{{min:{}={}, max:{}={}}}",
                min_key, min_value, max_key, max_value
            ),
            None => write!(f, "None"),
        }
    }
}
