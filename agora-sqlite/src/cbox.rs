use std::ops::{Deref, DerefMut};

/// Owner of a pointer allocated by the SQLite library, released with `dealloc` on drop.
#[derive(Debug)]
pub(crate) struct CBox<T> {
    pub(crate) ptr: *mut T,
    dealloc: fn(*mut T),
}

impl<T> CBox<T> {
    pub(crate) fn new(ptr: *mut T, dealloc: fn(*mut T)) -> Self {
        Self { ptr, dealloc }
    }

    pub(crate) fn is_null(&self) -> bool {
        self.ptr.is_null()
    }
}

impl<T> Drop for CBox<T> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            (self.dealloc)(self.ptr);
        }
    }
}

impl<T> Deref for CBox<T> {
    type Target = *mut T;

    fn deref(&self) -> &Self::Target {
        &self.ptr
    }
}

impl<T> DerefMut for CBox<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ptr
    }
}

// The handles are only touched by one thread at a time, behind the connection mutex.
unsafe impl<T> Send for CBox<T> {}
unsafe impl<T> Sync for CBox<T> {}

#[cfg(test)]
mod tests {
    use super::CBox;
    use std::{
        ptr,
        sync::atomic::{AtomicUsize, Ordering},
    };

    static RELEASED: AtomicUsize = AtomicUsize::new(0);

    #[test]
    fn releases_only_non_null_pointers() {
        let mut value = 123;
        {
            let ptr = CBox::new(ptr::null_mut::<i32>(), |_| {
                RELEASED.fetch_add(1, Ordering::SeqCst);
            });
            assert!(ptr.is_null());
        }
        assert_eq!(RELEASED.load(Ordering::SeqCst), 0);
        {
            let ptr = CBox::new(&mut value as *mut i32, |_| {
                RELEASED.fetch_add(1, Ordering::SeqCst);
            });
            assert_eq!(unsafe { **ptr }, 123);
        }
        assert_eq!(RELEASED.load(Ordering::SeqCst), 1);
    }
}
