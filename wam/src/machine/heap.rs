use crate::{instructions::Slot, log_trace};

use super::basic_types::{Address, Cell};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    #[error("address {address} is outside the heap (size {size})")]
    AddressOutOfRange { address: Address, size: usize },
    #[error("heap limit of {limit} cells exceeded")]
    OutOfMemory { limit: usize },
    #[error("reference chain starting at {address} does not terminate")]
    ReferenceCycle { address: Address },
}

#[derive(Debug)]
pub enum UnificationError {
    UnificationFailure,
    Memory(MemoryError),
}

impl From<MemoryError> for UnificationError {
    fn from(inner: MemoryError) -> Self {
        Self::Memory(inner)
    }
}

/// The previous contents of a bound cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailEntry {
    pub address: Address,
    pub previous: Cell,
}

/// Everything needed to undo the heap back to an earlier state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapSnapshot {
    heap_top: usize,
    trail_top: usize,
}

#[derive(Debug, Default)]
pub struct Heap {
    cells: Vec<Cell>,
    trail: Vec<TrailEntry>,
    limit: Option<usize>,
}

impl Heap {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            cells: Vec::new(),
            trail: Vec::new(),
            limit,
        }
    }

    pub fn top(&self) -> Address {
        Address(self.cells.len())
    }

    #[cfg(test)]
    pub fn trail(&self) -> &[TrailEntry] {
        &self.trail
    }

    fn check_limit(&self, additional: usize) -> Result<(), MemoryError> {
        match self.limit {
            Some(limit) if self.cells.len() + additional > limit => {
                Err(MemoryError::OutOfMemory { limit })
            }
            _ => Ok(()),
        }
    }

    pub fn new_variable(&mut self) -> Result<Address, MemoryError> {
        self.check_limit(1)?;

        let address = self.top();
        self.cells.push(Cell::Ref(address));

        log_trace!("New variable at {}", address);

        Ok(address)
    }

    /// Reserves `size` fresh unbound cells and returns the address of the first.
    pub fn allocate(&mut self, size: u16) -> Result<Address, MemoryError> {
        let size = usize::from(size);

        self.check_limit(size)?;

        let base = self.top();

        self.cells
            .extend((base.0..base.0 + size).map(|index| Cell::Ref(Address(index))));

        Ok(base)
    }

    pub fn load(&self, address: Address) -> Result<Cell, MemoryError> {
        self.cells
            .get(address.0)
            .copied()
            .ok_or(MemoryError::AddressOutOfRange {
                address,
                size: self.cells.len(),
            })
    }

    /// Writes a frame cell without trailing. Only used to initialise the cells of a fresh frame.
    pub fn store(&mut self, address: Address, cell: Cell) -> Result<(), MemoryError> {
        let size = self.cells.len();

        let slot = self
            .cells
            .get_mut(address.0)
            .ok_or(MemoryError::AddressOutOfRange { address, size })?;

        *slot = cell;

        Ok(())
    }

    pub fn store_in_frame(
        &mut self,
        base: Address,
        vn: Slot,
        cell: Cell,
    ) -> Result<(), MemoryError> {
        self.store(base.offset(vn), cell)
    }

    /// Follows references until reaching a constant or an unbound variable
    pub fn deref(&self, cell: Cell) -> Result<Cell, MemoryError> {
        let mut current = cell;

        for _ in 0..=self.cells.len() {
            match current {
                Cell::Const(_) => return Ok(current),
                Cell::Ref(address) => match self.load(address)? {
                    Cell::Ref(next) if next == address => return Ok(current),
                    next => current = next,
                },
            }
        }

        Err(MemoryError::ReferenceCycle {
            address: match cell {
                Cell::Ref(address) => address,
                Cell::Const(_) => Address(0),
            },
        })
    }

    /// Binds an unbound variable, recording its previous value on the trail
    pub fn bind(&mut self, variable: Address, value: Cell) -> Result<(), MemoryError> {
        let previous = self.load(variable)?;

        log_trace!("Binding {} to {}", variable, value);

        self.store(variable, value)?;
        self.trail.push(TrailEntry {
            address: variable,
            previous,
        });

        Ok(())
    }

    pub fn unify(&mut self, a: Cell, b: Cell) -> Result<(), UnificationError> {
        match (self.deref(a)?, self.deref(b)?) {
            (Cell::Ref(a), Cell::Ref(b)) if a == b => Ok(()),
            // The younger variable points to the older one, so reference chains always terminate
            (Cell::Ref(a), Cell::Ref(b)) => {
                if a < b {
                    self.bind(b, Cell::Ref(a))?;
                } else {
                    self.bind(a, Cell::Ref(b))?;
                }
                Ok(())
            }
            (Cell::Ref(variable), value @ Cell::Const(_))
            | (value @ Cell::Const(_), Cell::Ref(variable)) => {
                self.bind(variable, value)?;
                Ok(())
            }
            (Cell::Const(a), Cell::Const(b)) => {
                if a == b {
                    Ok(())
                } else {
                    log_trace!("Constant mismatch: {} != {}", a, b);
                    Err(UnificationError::UnificationFailure)
                }
            }
        }
    }

    pub fn save(&self) -> HeapSnapshot {
        HeapSnapshot {
            heap_top: self.cells.len(),
            trail_top: self.trail.len(),
        }
    }

    /// Undoes every binding made since `snapshot` was taken and discards younger cells
    pub fn restore(&mut self, snapshot: HeapSnapshot) {
        log_trace!(
            "Unwinding trail from {} to {}",
            self.trail.len(),
            snapshot.trail_top
        );

        while self.trail.len() > snapshot.trail_top {
            let Some(TrailEntry { address, previous }) = self.trail.pop() else {
                break;
            };

            if let Some(cell) = self.cells.get_mut(address.0) {
                *cell = previous;
            }
        }

        self.cells.truncate(snapshot.heap_top);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::Constant;

    fn heap_with_variables(count: u16) -> Heap {
        let mut heap = Heap::new(None);
        heap.allocate(count).unwrap();
        heap
    }

    #[test]
    fn unifying_a_variable_with_itself_does_not_bind() {
        let mut heap = heap_with_variables(1);
        let x = Cell::Ref(Address(0));

        heap.unify(x, x).unwrap();

        assert!(heap.trail().is_empty());
        assert_eq!(heap.load(Address(0)).unwrap(), x);
    }

    #[test]
    fn younger_variable_is_bound_to_older() {
        let mut heap = heap_with_variables(2);

        heap.unify(Cell::Ref(Address(0)), Cell::Ref(Address(1))).unwrap();

        assert_eq!(heap.load(Address(0)).unwrap(), Cell::Ref(Address(0)));
        assert_eq!(heap.load(Address(1)).unwrap(), Cell::Ref(Address(0)));
        assert_eq!(
            heap.trail(),
            &[TrailEntry {
                address: Address(1),
                previous: Cell::Ref(Address(1)),
            }]
        );
    }

    #[test]
    fn bound_variables_dereference_to_their_value() {
        let mut heap = heap_with_variables(3);
        let a = Cell::Const(Constant(0));

        heap.unify(Cell::Ref(Address(2)), Cell::Ref(Address(1))).unwrap();
        heap.unify(Cell::Ref(Address(1)), Cell::Ref(Address(0))).unwrap();
        heap.unify(Cell::Ref(Address(2)), a).unwrap();

        for index in 0..3 {
            assert_eq!(heap.deref(Cell::Ref(Address(index))).unwrap(), a);
        }

        assert!(matches!(
            heap.unify(Cell::Ref(Address(1)), Cell::Const(Constant(1))),
            Err(UnificationError::UnificationFailure)
        ));
    }

    #[test]
    fn restore_undoes_bindings_and_discards_cells() {
        let mut heap = heap_with_variables(2);

        let snapshot = heap.save();

        heap.unify(Cell::Ref(Address(0)), Cell::Const(Constant(3)))
            .unwrap();
        let z = heap.new_variable().unwrap();
        heap.unify(Cell::Ref(z), Cell::Ref(Address(1))).unwrap();

        assert_eq!(heap.trail().len(), 2);

        heap.restore(snapshot);

        assert_eq!(heap.top(), Address(2));
        assert!(heap.trail().is_empty());
        assert_eq!(heap.load(Address(0)).unwrap(), Cell::Ref(Address(0)));
        assert_eq!(heap.load(Address(1)).unwrap(), Cell::Ref(Address(1)));
    }

    #[test]
    fn trail_grows_by_one_entry_per_binding() {
        let mut heap = heap_with_variables(4);

        let bindings = [
            (Cell::Ref(Address(0)), Cell::Const(Constant(0))),
            (Cell::Ref(Address(3)), Cell::Ref(Address(2))),
            (Cell::Ref(Address(1)), Cell::Ref(Address(0))),
            (Cell::Ref(Address(2)), Cell::Ref(Address(1))),
        ];

        for (expected, (a, b)) in bindings.into_iter().enumerate() {
            assert_eq!(heap.trail().len(), expected);
            heap.unify(a, b).unwrap();
        }

        assert_eq!(heap.trail().len(), 4);

        // Already unified, so nothing more is trailed
        heap.unify(Cell::Ref(Address(3)), Cell::Const(Constant(0)))
            .unwrap();
        assert_eq!(heap.trail().len(), 4);
    }

    #[test]
    fn heap_limit_is_enforced() {
        let mut heap = Heap::new(Some(3));

        heap.allocate(2).unwrap();
        heap.new_variable().unwrap();

        assert_eq!(
            heap.new_variable(),
            Err(MemoryError::OutOfMemory { limit: 3 })
        );
        assert_eq!(heap.allocate(1), Err(MemoryError::OutOfMemory { limit: 3 }));
    }

    #[test]
    fn out_of_range_access_is_an_error() {
        let heap = heap_with_variables(1);

        assert_eq!(
            heap.load(Address(1)),
            Err(MemoryError::AddressOutOfRange {
                address: Address(1),
                size: 1
            })
        );
    }
}
