use std::any::Any;

use crate::runtime::error::RuntimeError;
use crate::runtime::object::RuntimeObject;
use crate::runtime::value::Value;

pub struct ListObject {
    values: Vec<Value>,
}

impl ListObject {
    pub fn new(values: Vec<Value>) -> ListObject {
        ListObject { values }
    }

    fn checked_index(&self, index: i64) -> Result<usize, RuntimeError> {
        if index < 0 {
            return Err(RuntimeError::NegativeListIndex { index });
        }
        let index = index as usize;
        if index >= self.values.len() {
            return Err(RuntimeError::ListIndexOutOfBounds {
                index,
                len: self.values.len(),
            });
        }
        Ok(index)
    }
}

impl RuntimeObject for ListObject {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "list"
    }

    fn render(&self) -> String {
        let rendered = self
            .values
            .iter()
            .map(Value::render)
            .collect::<Vec<_>>()
            .join(", ");
        format!("[{rendered}]")
    }

    fn is_truthy(&self) -> bool {
        !self.values.is_empty()
    }

    fn index_get(&self, index: i64) -> Result<Value, RuntimeError> {
        let index = self.checked_index(index)?;
        Ok(self.values[index].clone())
    }

    fn index_set(&mut self, index: i64, value: Value) -> Result<(), RuntimeError> {
        let index = self.checked_index(index)?;
        self.values[index] = value;
        Ok(())
    }

    fn items(&self) -> Result<Vec<Value>, RuntimeError> {
        Ok(self.values.clone())
    }

    fn length(&self) -> Result<usize, RuntimeError> {
        Ok(self.values.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_in_bounds() {
        let list = ListObject::new(vec![Value::Integer(1), Value::Integer(2)]);
        let value = list.index_get(1).expect("index should be valid");
        assert!(matches!(value, Value::Integer(2)));
    }

    #[test]
    fn rejects_negative_and_out_of_bounds_indexes() {
        let mut list = ListObject::new(vec![Value::Integer(1)]);
        assert_eq!(
            list.index_get(-1).err(),
            Some(RuntimeError::NegativeListIndex { index: -1 })
        );
        assert_eq!(
            list.index_set(3, Value::None),
            Err(RuntimeError::ListIndexOutOfBounds { index: 3, len: 1 })
        );
    }

    #[test]
    fn renders_elements_comma_separated() {
        let list = ListObject::new(vec![
            Value::Integer(1),
            Value::string("a"),
            Value::Boolean(true),
        ]);
        assert_eq!(list.render(), "[1, a, True]");
    }
}
