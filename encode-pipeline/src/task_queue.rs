use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex},
};

/// Post-processing work for a submitted frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PostProcessTask {
    pub display_order: u64,
    pub encode_order: u64,
}

struct QueueState<T> {
    tasks: VecDeque<T>,
    closed: bool,
}

/// An unbounded FIFO shared by the submitting thread and the post-processing worker.
pub struct TaskQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Appends a task. Returns false, dropping the task, if the queue was closed.
    pub fn push(&self, task: T) -> bool {
        let mut state = self.state.lock().expect("the lock should not be poisoned");
        if state.closed {
            return false;
        }
        state.tasks.push_back(task);
        self.available.notify_one();
        true
    }

    /// Blocks until a task is available. Once the queue is closed, the remaining tasks are
    /// returned and then `None`.
    pub fn pop(&self) -> Option<T> {
        let state = self.state.lock().expect("the lock should not be poisoned");
        let mut state = self
            .available
            .wait_while(state, |state| state.tasks.is_empty() && !state.closed)
            .expect("the lock should not be poisoned");
        state.tasks.pop_front()
    }

    pub fn close(&self) {
        self.state.lock().expect("the lock should not be poisoned").closed = true;
        self.available.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("the lock should not be poisoned").tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{thread, time::Duration};

    #[test]
    fn test_fifo() {
        let queue = TaskQueue::new();
        for n in 0..3 {
            assert!(queue.push(PostProcessTask {
                display_order: n,
                encode_order: n,
            }));
        }
        assert_eq!(queue.len(), 3);
        for n in 0..3 {
            assert_eq!(queue.pop().map(|t| t.encode_order), Some(n));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_concurrent_fifo() {
        const N: u64 = 10000;
        let queue = TaskQueue::new();

        let popped = thread::scope(|s| {
            let consumer = s.spawn(|| {
                let mut popped = Vec::with_capacity(N as usize);
                while (popped.len() as u64) < N {
                    popped.push(queue.pop().expect("the queue shouldn't close"));
                    if popped.len() % 1000 == 0 {
                        thread::sleep(Duration::from_millis(1));
                    }
                }
                popped
            });

            for n in 0..N {
                queue.push(PostProcessTask {
                    display_order: n * 3 % N,
                    encode_order: n,
                });
                if n % 777 == 0 {
                    thread::yield_now();
                }
            }

            consumer.join().unwrap()
        });

        assert_eq!(popped.len() as u64, N);
        for (n, task) in popped.iter().enumerate() {
            assert_eq!(task.encode_order, n as u64);
            assert_eq!(task.display_order, n as u64 * 3 % N);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_close() {
        let queue = TaskQueue::new();
        queue.push(1);

        thread::scope(|s| {
            s.spawn(|| {
                thread::sleep(Duration::from_millis(20));
                queue.close();
            });
            assert_eq!(queue.pop(), Some(1));
            // Blocks until the queue is closed.
            assert_eq!(queue.pop(), None);
        });

        assert!(!queue.push(2));
        assert_eq!(queue.pop(), None);
    }
}
