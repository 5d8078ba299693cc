use bytemuck::{Pod, Zeroable};

use super::*;
use crate::{Task, WorkContext};

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct Tag {
  id: u32,
}

impl Task for Tag {
  fn execute(self, _ctx: &WorkContext<'_>) {}
}

fn tags(ids: impl IntoIterator<Item = u32>) -> Vec<WorkItem> {
  ids.into_iter().map(|id| WorkItem::new(Tag { id })).collect()
}

fn id_of(item: &WorkItem) -> u32 {
  item.read_payload::<Tag>().map(|tag| tag.id).unwrap_or(u32::MAX)
}

#[test]
fn test_empty_queue() {
  let queue = WorkQueue::new();
  assert!(queue.is_empty());
  assert_eq!(queue.len(), 0);
  assert!(queue.pop().is_none());
}

#[test]
fn test_pop_is_lifo() {
  let queue = WorkQueue::new();
  queue.push_many(&tags([1, 2, 3]));

  let order: Vec<u32> = std::iter::from_fn(|| queue.pop()).map(|item| id_of(&item)).collect();
  assert_eq!(order, vec![3, 2, 1]);
}

#[test]
fn test_pop_up_to_takes_newest_first() {
  let queue = WorkQueue::with_capacity(8);
  queue.push_many(&tags(0..5));

  let mut out = Vec::new();
  assert_eq!(queue.pop_up_to(3, &mut out), 3);
  assert_eq!(out.iter().map(id_of).collect::<Vec<_>>(), vec![4, 3, 2]);
  assert_eq!(queue.len(), 2);
}

#[test]
fn test_pop_up_to_more_than_available() {
  let queue = WorkQueue::new();
  queue.push_many(&tags([9, 10]));

  let mut out = Vec::new();
  assert_eq!(queue.pop_up_to(16, &mut out), 2);
  assert!(queue.is_empty());
  assert_eq!(queue.pop_up_to(16, &mut out), 0);
  assert_eq!(out.len(), 2);
}

#[test]
fn test_push_empty_slice_is_noop() {
  let queue = WorkQueue::new();
  queue.push_many(&[]);
  assert!(queue.is_empty());
}

#[test]
fn test_release_drops_everything() {
  let queue = WorkQueue::new();
  queue.push_many(&tags(0..100));
  assert_eq!(queue.release(), 100);
  assert!(queue.is_empty());
}

#[test]
fn test_concurrent_pushes_are_all_kept() {
  let queue = WorkQueue::new();
  std::thread::scope(|scope| {
    for t in 0..4u32 {
      let queue = &queue;
      scope.spawn(move || {
        for i in 0..250u32 {
          queue.push_many(&tags([t * 1000 + i]));
        }
      });
    }
  });
  assert_eq!(queue.len(), 1000);
}
