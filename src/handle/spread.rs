//! Array spreading and collecting adapters.

use smallvec::SmallVec;

use super::{MethodHandle, can_convert, convert};
use crate::error::{HandleError, Throwable};
use crate::signature::Type;
use crate::value::{ArrayValue, Value};

impl MethodHandle {
    /// Replaces the `count` parameters starting at `position` with a single
    /// array parameter whose items are spread into them.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::IllegalArgument`] if `array_type` is not an
    /// array type or the range exceeds the arity, and
    /// [`HandleError::SignatureMismatch`] if the element type cannot be
    /// converted to one of the spread parameters.
    ///
    /// Invoking the result with an array of the wrong length raises
    /// `IllegalArgumentException`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use callgraft::{MethodHandle, Value};
    /// use callgraft::signature::{Signature, Type};
    /// use callgraft::value::ArrayValue;
    ///
    /// let add = MethodHandle::new(
    ///     Signature::new(Type::INT, [Type::INT, Type::INT])?,
    ///     |arguments| Ok(Value::Int(arguments[0].as_int()? + arguments[1].as_int()?)),
    /// );
    /// let spread = add.as_spreader(0, &Type::array_of(Type::INT), 2)?;
    /// let pair = ArrayValue::new(Type::INT, [Value::Int(20), Value::Int(22)]);
    /// assert_eq!(spread.invoke_exact(&[Value::Array(pair)]), Ok(Value::Int(42)));
    /// # Ok::<(), callgraft::HandleError>(())
    /// ```
    pub fn as_spreader(
        &self,
        position: usize,
        array_type: &Type,
        count: usize,
    ) -> Result<Self, HandleError> {
        let element = array_element("as_spreader", array_type)?;
        if position > self.arity() || count > self.arity() - position {
            return Err(HandleError::illegal_argument(
                "as_spreader",
                format!(
                    "cannot spread {count} parameters at {position} of {}",
                    self.signature()
                ),
            ));
        }
        let spread = &self.parameters()[position..position + count];
        if let Some(parameter) = spread.iter().find(|parameter| !can_convert(&element, parameter)) {
            return Err(HandleError::signature_mismatch(
                "as_spreader",
                format!("array element {element} cannot be converted to {parameter}"),
            ));
        }
        let signature = self
            .signature()
            .drop_parameters(position, position + count)?
            .insert_parameters(position, [array_type.clone()])?;
        let target = self.clone();
        Ok(Self::new(signature, move |arguments| {
            let items: &[Value] = match &arguments[position] {
                Value::Null if count == 0 => &[],
                array => array.as_array()?.items(),
            };
            if items.len() != count {
                return Err(Throwable::illegal_argument(format!(
                    "array is not of length {count}"
                )));
            }
            let parameters = &target.parameters()[position..position + count];
            let mut spread: SmallVec<[Value; 8]> = SmallVec::with_capacity(target.arity());
            spread.extend(arguments[..position].iter().cloned());
            for (item, parameter) in items.iter().zip(parameters) {
                spread.push(convert(item.clone(), &item.static_type(), parameter)?);
            }
            spread.extend(arguments[position + 1..].iter().cloned());
            target.invoke_basic(&spread)
        }))
    }

    /// Replaces the array parameter at `position` with `count` parameters
    /// of its element type, collected into a fresh array on each call.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::IllegalArgument`] if `array_type` is not an
    /// array type or `position` is out of range, and
    /// [`HandleError::SignatureMismatch`] if the parameter at `position`
    /// does not accept `array_type`.
    pub fn as_collector(
        &self,
        position: usize,
        array_type: &Type,
        count: usize,
    ) -> Result<Self, HandleError> {
        let element = array_element("as_collector", array_type)?;
        let Some(parameter) = self.signature().parameter(position) else {
            return Err(HandleError::illegal_argument(
                "as_collector",
                format!("no parameter at {position} in {}", self.signature()),
            ));
        };
        if !parameter.is_assignable_from(array_type) {
            return Err(HandleError::signature_mismatch(
                "as_collector",
                format!("parameter {position} of type {parameter} does not accept {array_type}"),
            ));
        }
        let signature = self
            .signature()
            .drop_parameters(position, position + 1)?
            .insert_parameters(position, std::iter::repeat_n(element.clone(), count))?;
        let target = self.clone();
        Ok(Self::new(signature, move |arguments| {
            let collected = ArrayValue::new(
                element.clone(),
                arguments[position..position + count].iter().cloned(),
            );
            let mut gathered: SmallVec<[Value; 8]> = SmallVec::with_capacity(target.arity());
            gathered.extend(arguments[..position].iter().cloned());
            gathered.push(Value::Array(collected));
            gathered.extend(arguments[position + count..].iter().cloned());
            target.invoke_basic(&gathered)
        }))
    }
}

fn array_element(operation: &'static str, array_type: &Type) -> Result<Type, HandleError> {
    array_type.element_type().cloned().ok_or_else(|| {
        HandleError::illegal_argument(operation, format!("{array_type} is not an array type"))
    })
}
