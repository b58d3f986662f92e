use serde::Serialize;

/// A field that may be written exactly once.
///
/// A second `set` hands the rejected value back instead of overwriting, and the
/// caller turns that into a [`crate::ContractViolation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SetOnce<T> {
    value: Option<T>,
}

impl<T> SetOnce<T> {
    pub const fn new() -> Self {
        Self { value: None }
    }

    pub fn set(&mut self, value: T) -> Result<(), T> {
        if self.value.is_some() {
            return Err(value);
        }
        self.value = Some(value);
        Ok(())
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

impl<T: Copy> SetOnce<T> {
    pub fn value(&self) -> Option<T> {
        self.value
    }
}

impl<T> Default for SetOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}
