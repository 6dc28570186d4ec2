use std::fmt;

/// Operand stack with a hard size limit.
///
/// The limit comes from the plan (the compiler computes the exact maximum
/// depth), so exceeding it means the plan is malformed. Underflow and
/// overflow are reported as errors rather than panics; the caller attaches
/// the program counter.
///
/// # Examples
///
/// ```ignore
/// let mut stack = Stack::new(100);
/// stack.push(42).unwrap();
/// stack.push(17).unwrap();
/// assert_eq!(stack.pop(), Ok(17));
/// assert_eq!(stack.peek(), Ok(&42));
/// assert_eq!(stack.len(), 1);
/// ```
pub struct Stack<T> {
    items: Vec<T>,
    max_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    Overflow { limit: usize },
    Underflow,
}

impl<T> Stack<T> {
    /// Creates a new stack with the specified maximum size.
    ///
    /// Pre-allocates up to 256 slots to avoid frequent reallocations.
    pub fn new(max_size: usize) -> Self {
        Self {
            items: Vec::with_capacity(max_size.min(256)),
            max_size,
        }
    }

    #[inline]
    pub fn push(&mut self, value: T) -> Result<(), StackError> {
        if self.items.len() >= self.max_size {
            return Err(StackError::Overflow {
                limit: self.max_size,
            });
        }
        self.items.push(value);
        Ok(())
    }

    #[inline]
    pub fn pop(&mut self) -> Result<T, StackError> {
        self.items.pop().ok_or(StackError::Underflow)
    }

    #[inline]
    pub fn peek(&self) -> Result<&T, StackError> {
        self.items.last().ok_or(StackError::Underflow)
    }

    #[inline]
    pub fn peek_mut(&mut self) -> Result<&mut T, StackError> {
        self.items.last_mut().ok_or(StackError::Underflow)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Clears the stack and adopts a new size limit. Keeps the allocation.
    pub fn reset(&mut self, max_size: usize) {
        self.items.clear();
        self.max_size = max_size;
    }

    /// Removes the top `n` elements, returned bottom to top.
    ///
    /// Fails without removing anything if fewer than `n` are present.
    pub fn pop_n(&mut self, n: usize) -> Result<std::vec::Drain<'_, T>, StackError> {
        let len = self.items.len();
        if n > len {
            return Err(StackError::Underflow);
        }
        Ok(self.items.drain(len - n..))
    }

    /// The top `n` elements, bottom to top.
    pub fn top_n(&self, n: usize) -> Result<&[T], StackError> {
        let len = self.items.len();
        if n > len {
            Err(StackError::Underflow)
        } else {
            Ok(&self.items[len - n..])
        }
    }

    /// Iterates from bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("items", &self.items)
            .field("max_size", &self.max_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let mut stack = Stack::new(10);
        stack.push(1).unwrap();
        stack.push(2).unwrap();
        assert_eq!(stack.peek(), Ok(&2));
        assert_eq!(stack.pop(), Ok(2));
        assert_eq!(stack.pop(), Ok(1));
        assert_eq!(stack.pop(), Err(StackError::Underflow));
        assert_eq!(stack.peek(), Err(StackError::Underflow));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut stack = Stack::new(1);
        stack.push(1).unwrap();
        assert_eq!(stack.push(2), Err(StackError::Overflow { limit: 1 }));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_pop_n() {
        let mut stack = Stack::new(10);
        for i in 1..=4 {
            stack.push(i).unwrap();
        }
        let top: Vec<i32> = stack.pop_n(2).unwrap().collect();
        assert_eq!(top, [3, 4]);
        assert_eq!(stack.len(), 2);

        assert!(stack.pop_n(3).is_err());
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop_n(0).unwrap().count(), 0);
    }

    #[test]
    fn test_top_n() {
        let mut stack = Stack::new(10);
        for i in [10, 20, 30] {
            stack.push(i).unwrap();
        }
        assert_eq!(stack.top_n(2), Ok(&[20, 30][..]));
        assert_eq!(stack.top_n(4), Err(StackError::Underflow));
    }

    #[test]
    fn test_reset_keeps_nothing() {
        let mut stack = Stack::new(2);
        stack.push(1).unwrap();
        stack.reset(5);
        assert!(stack.is_empty());
        assert_eq!(stack.capacity(), 5);
        assert_eq!(stack.iter().count(), 0);
    }

    #[test]
    fn test_peek_mut() {
        let mut stack = Stack::new(2);
        stack.push(1).unwrap();
        *stack.peek_mut().unwrap() = 5;
        assert_eq!(stack.pop(), Ok(5));
    }
}
