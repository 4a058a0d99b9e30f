//! Array, struct and map instructions.

use crate::{
    ExecutionEngine, Instruction, OpCode, StackItem, VmError, VmResult, MAX_STACK_SIZE,
};
use num_traits::ToPrimitive;

impl ExecutionEngine {
    pub(crate) fn exec_compound(&mut self, ix: &Instruction) -> VmResult<()> {
        use OpCode::*;
        match ix.opcode {
            Pack => {
                let count = self.pop_usize()?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.pop()?);
                }
                self.push(StackItem::array_of(items))
            }
            Unpack => {
                let compound = self.pop()?;
                let items = match &compound {
                    StackItem::Array(items) | StackItem::Struct(items) => items.borrow().clone(),
                    other => {
                        return Err(VmError::InvalidOperation(format!(
                            "UNPACK of {:?}",
                            other.item_type()
                        )))
                    }
                };
                let count = items.len();
                for item in items.into_iter().rev() {
                    self.push(item)?;
                }
                self.push(StackItem::from_int(count as i64))
            }
            NewArray0 => self.push(StackItem::new_array()),
            NewArray => {
                let count = self.checked_count()?;
                self.push(StackItem::array_of(
                    (0..count).map(|_| StackItem::Null).collect(),
                ))
            }
            NewStruct0 => self.push(StackItem::struct_of(Vec::new())),
            NewStruct => {
                let count = self.checked_count()?;
                self.push(StackItem::struct_of(
                    (0..count).map(|_| StackItem::Null).collect(),
                ))
            }
            NewMap => self.push(StackItem::new_map()),
            Size => {
                let item = self.pop()?;
                let size = match &item {
                    StackItem::Array(items) | StackItem::Struct(items) => items.borrow().len(),
                    StackItem::Map(entries) => entries.borrow().len(),
                    other => other.try_bytes()?.len(),
                };
                self.push(StackItem::from_int(size as i64))
            }
            HasKey => {
                let key = self.pop()?;
                let collection = self.pop()?;
                let has = match &collection {
                    StackItem::Array(items) | StackItem::Struct(items) => {
                        let index = key_as_index(&key)?;
                        index < items.borrow().len()
                    }
                    StackItem::Map(entries) => {
                        require_primitive_key(&key)?;
                        let entries = entries.borrow();
                        let mut found = false;
                        for (existing, _) in entries.iter() {
                            if existing.equals(&key)? {
                                found = true;
                                break;
                            }
                        }
                        found
                    }
                    other => {
                        let index = key_as_index(&key)?;
                        index < other.try_bytes()?.len()
                    }
                };
                self.push(StackItem::Boolean(has))
            }
            Keys => {
                let map = self.pop_map()?;
                let keys: Vec<StackItem> = map.borrow().iter().map(|(k, _)| k.clone()).collect();
                self.push(StackItem::array_of(keys))
            }
            Values => {
                let collection = self.pop()?;
                let values = match &collection {
                    StackItem::Array(items) | StackItem::Struct(items) => items.borrow().clone(),
                    StackItem::Map(entries) => {
                        entries.borrow().iter().map(|(_, v)| v.clone()).collect()
                    }
                    other => {
                        return Err(VmError::InvalidOperation(format!(
                            "VALUES of {:?}",
                            other.item_type()
                        )))
                    }
                };
                self.push(StackItem::array_of(values))
            }
            PickItem => {
                let key = self.pop()?;
                let collection = self.pop()?;
                let value = match &collection {
                    StackItem::Array(items) | StackItem::Struct(items) => {
                        let index = key_as_index(&key)?;
                        items
                            .borrow()
                            .get(index)
                            .cloned()
                            .ok_or_else(|| index_oob(index))?
                    }
                    StackItem::Map(entries) => {
                        require_primitive_key(&key)?;
                        let entries = entries.borrow();
                        let mut found = None;
                        for (existing, value) in entries.iter() {
                            if existing.equals(&key)? {
                                found = Some(value.clone());
                                break;
                            }
                        }
                        found.ok_or_else(|| {
                            VmError::InvalidOperation("key not found in map".to_string())
                        })?
                    }
                    other => {
                        let bytes = other.try_bytes()?;
                        let index = key_as_index(&key)?;
                        let byte = *bytes.get(index).ok_or_else(|| index_oob(index))?;
                        StackItem::from_int(byte as i64)
                    }
                };
                self.push(value)
            }
            Append => {
                let item = self.pop()?;
                let collection = self.pop()?;
                // Structs append by value.
                let item = match item {
                    StackItem::Struct(_) => item.deep_copy(),
                    other => other,
                };
                match &collection {
                    StackItem::Array(items) | StackItem::Struct(items) => {
                        self.counter().add(&item)?;
                        items.borrow_mut().push(item);
                    }
                    other => {
                        return Err(VmError::InvalidOperation(format!(
                            "APPEND to {:?}",
                            other.item_type()
                        )))
                    }
                }
                Ok(())
            }
            SetItem => {
                let value = self.pop()?;
                let key = self.pop()?;
                let collection = self.pop()?;
                match &collection {
                    StackItem::Array(items) | StackItem::Struct(items) => {
                        let index = key_as_index(&key)?;
                        let mut items = items.borrow_mut();
                        let slot = items.get_mut(index).ok_or_else(|| index_oob(index))?;
                        self.counter().remove(slot);
                        self.counter().add(&value)?;
                        *slot = value;
                    }
                    StackItem::Map(entries) => {
                        require_primitive_key(&key)?;
                        let mut entries = entries.borrow_mut();
                        let mut replaced = false;
                        for (existing, existing_value) in entries.iter_mut() {
                            if existing.equals(&key)? {
                                self.counter().remove(existing_value);
                                self.counter().add(&value)?;
                                *existing_value = value.clone();
                                replaced = true;
                                break;
                            }
                        }
                        if !replaced {
                            self.counter().add(&key)?;
                            self.counter().add(&value)?;
                            entries.push((key, value));
                        }
                    }
                    other => {
                        return Err(VmError::InvalidOperation(format!(
                            "SETITEM on {:?}",
                            other.item_type()
                        )))
                    }
                }
                Ok(())
            }
            ReverseItems => {
                let collection = self.pop()?;
                match &collection {
                    StackItem::Array(items) | StackItem::Struct(items) => {
                        items.borrow_mut().reverse();
                        Ok(())
                    }
                    other => Err(VmError::InvalidOperation(format!(
                        "REVERSEITEMS on {:?}",
                        other.item_type()
                    ))),
                }
            }
            Remove => {
                let key = self.pop()?;
                let collection = self.pop()?;
                match &collection {
                    StackItem::Array(items) | StackItem::Struct(items) => {
                        let index = key_as_index(&key)?;
                        let mut items = items.borrow_mut();
                        if index >= items.len() {
                            return Err(index_oob(index));
                        }
                        let removed = items.remove(index);
                        self.counter().remove(&removed);
                        Ok(())
                    }
                    StackItem::Map(entries) => {
                        require_primitive_key(&key)?;
                        let mut entries = entries.borrow_mut();
                        let mut position = None;
                        for (i, (existing, _)) in entries.iter().enumerate() {
                            if existing.equals(&key)? {
                                position = Some(i);
                                break;
                            }
                        }
                        if let Some(i) = position {
                            let (removed_key, removed_value) = entries.remove(i);
                            self.counter().remove(&removed_key);
                            self.counter().remove(&removed_value);
                        }
                        Ok(())
                    }
                    other => Err(VmError::InvalidOperation(format!(
                        "REMOVE on {:?}",
                        other.item_type()
                    ))),
                }
            }
            ClearItems => {
                let collection = self.pop()?;
                match &collection {
                    StackItem::Array(items) | StackItem::Struct(items) => {
                        for item in items.borrow().iter() {
                            self.counter().remove(item);
                        }
                        items.borrow_mut().clear();
                        Ok(())
                    }
                    StackItem::Map(entries) => {
                        for (key, value) in entries.borrow().iter() {
                            self.counter().remove(key);
                            self.counter().remove(value);
                        }
                        entries.borrow_mut().clear();
                        Ok(())
                    }
                    other => Err(VmError::InvalidOperation(format!(
                        "CLEARITEMS on {:?}",
                        other.item_type()
                    ))),
                }
            }
            PopItem => {
                let collection = self.pop()?;
                match &collection {
                    StackItem::Array(items) | StackItem::Struct(items) => {
                        let popped = items.borrow_mut().pop().ok_or_else(|| {
                            VmError::InvalidOperation("POPITEM of empty array".to_string())
                        })?;
                        self.counter().remove(&popped);
                        self.push(popped)
                    }
                    other => Err(VmError::InvalidOperation(format!(
                        "POPITEM on {:?}",
                        other.item_type()
                    ))),
                }
            }
            _ => unreachable!("compound dispatch covers all variants"),
        }
    }

    fn checked_count(&mut self) -> VmResult<usize> {
        let count = self.pop_usize()?;
        if count > MAX_STACK_SIZE {
            return Err(VmError::LimitExceeded(format!("new compound of {count}")));
        }
        Ok(count)
    }

    fn pop_map(&mut self) -> VmResult<std::rc::Rc<std::cell::RefCell<Vec<(StackItem, StackItem)>>>> {
        match self.pop()? {
            StackItem::Map(entries) => Ok(entries),
            other => Err(VmError::InvalidOperation(format!(
                "expected map, got {:?}",
                other.item_type()
            ))),
        }
    }
}

fn key_as_index(key: &StackItem) -> VmResult<usize> {
    let value = key.try_integer()?;
    value
        .to_usize()
        .ok_or_else(|| VmError::InvalidOperation(format!("invalid index {value}")))
}

fn index_oob(index: usize) -> VmError {
    VmError::InvalidOperation(format!("index {index} out of range"))
}

fn require_primitive_key(key: &StackItem) -> VmResult<()> {
    if key.is_primitive() {
        Ok(())
    } else {
        Err(VmError::InvalidOperation(format!(
            "{:?} cannot be a map key",
            key.item_type()
        )))
    }
}
