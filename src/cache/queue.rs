//! Priority queue of pending decode requests.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::path::PathBuf;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct QueuedRequest {
    priority: u32,
    seq: u64,
    path: PathBuf,
}

/// Min-heap on (priority, enqueue order): lower priority values come out
/// first and equal priorities come out in the order they were pushed.
#[derive(Debug, Default)]
pub(super) struct RequestQueue {
    heap: BinaryHeap<Reverse<QueuedRequest>>,
    next_seq: u64,
}

impl RequestQueue {
    pub fn push(&mut self, path: PathBuf, priority: u32) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(QueuedRequest {
            priority,
            seq,
            path,
        }));
    }

    pub fn pop(&mut self) -> Option<PathBuf> {
        self.heap.pop().map(|Reverse(request)| request.path)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_then_fifo() {
        let mut queue = RequestQueue::default();
        queue.push("late.jpg".into(), 5);
        queue.push("a.jpg".into(), 0);
        queue.push("z.jpg".into(), 5);
        queue.push("b.jpg".into(), 0);

        let order: Vec<PathBuf> = std::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(
            order,
            ["a.jpg", "b.jpg", "late.jpg", "z.jpg"].map(PathBuf::from)
        );
        assert_eq!(queue.len(), 0);
    }
}
