//! Myers middle-snake search.
//!
//! The search works on an explicit stack of sub-ranges. Each range is split
//! around its middle snake until nothing is left; every snake with a
//! non-empty diagonal is collected in global coordinates.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::callback::DiffCallback;
use crate::error::{DiffError, DiffResult};

/// A diagonal run of identity-matched positions: `old[x + i]` matches
/// `new[y + i]` for every `i < size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Snake {
    pub x: usize,
    pub y: usize,
    pub size: usize,
}

impl Snake {
    pub const fn new(x: usize, y: usize, size: usize) -> Self {
        Self { x, y, size }
    }

    /// One past the last matched old position.
    pub const fn end_x(&self) -> usize {
        self.x + self.size
    }

    /// One past the last matched new position.
    pub const fn end_y(&self) -> usize {
        self.y + self.size
    }
}

/// A rectangular sub-problem, `[old_start, old_end) x [new_start, new_end)`.
#[derive(Clone, Copy, Debug)]
struct Range {
    old_start: usize,
    old_end: usize,
    new_start: usize,
    new_end: usize,
}

impl Range {
    fn old_size(&self) -> usize {
        self.old_end - self.old_start
    }

    fn new_size(&self) -> usize {
        self.new_end - self.new_start
    }
}

/// Raw meeting point of the two frontiers. It may start (forward) or end
/// (reverse) with one insertion or removal ahead of the diagonal.
#[derive(Clone, Copy, Debug)]
struct MiddleSnake {
    start_x: isize,
    start_y: isize,
    end_x: isize,
    end_y: isize,
    reverse: bool,
}

impl MiddleSnake {
    fn has_addition_or_removal(&self) -> bool {
        self.end_y - self.start_y != self.end_x - self.start_x
    }

    fn is_addition(&self) -> bool {
        self.end_y - self.start_y > self.end_x - self.start_x
    }

    fn diagonal_size(&self) -> usize {
        (self.end_x - self.start_x).min(self.end_y - self.start_y) as usize
    }

    fn to_snake(self) -> Snake {
        let (x, y) = (self.start_x as usize, self.start_y as usize);
        if !self.has_addition_or_removal() {
            return Snake::new(x, y, (self.end_x - self.start_x) as usize);
        }
        let size = self.diagonal_size();
        if self.reverse {
            Snake::new(x, y, size)
        } else if self.is_addition() {
            Snake::new(x, y + 1, size)
        } else {
            Snake::new(x + 1, y, size)
        }
    }
}

/// Diagonal frontier indexed by `k` in `-n..=n`.
struct CenteredArray {
    data: Vec<isize>,
    mid: isize,
}

impl CenteredArray {
    fn new(half: usize) -> Self {
        Self {
            data: vec![0; half * 2 + 1],
            mid: half as isize,
        }
    }

    fn get(&self, k: isize) -> isize {
        self.data[(k + self.mid) as usize]
    }

    fn set(&mut self, k: isize, value: isize) {
        self.data[(k + self.mid) as usize] = value;
    }
}

/// Compute every snake of the shortest edit path between the two lists,
/// sorted by `(x, y)` and prefixed with an empty root snake at the origin
/// when the first match does not start there.
pub(crate) fn find_snakes<C>(callback: &C, old_len: usize, new_len: usize) -> DiffResult<Vec<Snake>>
where
    C: DiffCallback + ?Sized,
{
    let mut snakes = Vec::new();
    let mut stack = vec![Range {
        old_start: 0,
        old_end: old_len,
        new_start: 0,
        new_end: new_len,
    }];

    // Both frontiers are sized for the whole problem once; sub-ranges only
    // ever need fewer diagonals.
    let max = (old_len + new_len + 1) / 2;
    let mut forward = CenteredArray::new(max + 1);
    let mut backward = CenteredArray::new(max + 1);

    while let Some(range) = stack.pop() {
        let Some(middle) = mid_point(&range, callback, &mut forward, &mut backward)? else {
            continue;
        };
        if middle.diagonal_size() > 0 {
            snakes.push(middle.to_snake());
        }
        stack.push(Range {
            old_start: range.old_start,
            old_end: middle.start_x as usize,
            new_start: range.new_start,
            new_end: middle.start_y as usize,
        });
        stack.push(Range {
            old_start: middle.end_x as usize,
            old_end: range.old_end,
            new_start: middle.end_y as usize,
            new_end: range.new_end,
        });
    }

    snakes.sort_by(|a, b| (a.x, a.y).cmp(&(b.x, b.y)));
    if snakes.first().map_or(true, |s| s.x != 0 || s.y != 0) {
        snakes.insert(0, Snake::new(0, 0, 0));
    }
    trace!(old_len, new_len, snakes = snakes.len(), "snakes collected");
    Ok(snakes)
}

fn mid_point<C>(
    range: &Range,
    callback: &C,
    forward: &mut CenteredArray,
    backward: &mut CenteredArray,
) -> DiffResult<Option<MiddleSnake>>
where
    C: DiffCallback + ?Sized,
{
    if range.old_size() < 1 || range.new_size() < 1 {
        return Ok(None);
    }
    let max = (range.old_size() + range.new_size() + 1) / 2;
    forward.set(1, range.old_start as isize);
    backward.set(1, range.old_end as isize);
    for d in 0..=max as isize {
        if let Some(snake) = forward_step(range, callback, forward, backward, d) {
            return Ok(Some(snake));
        }
        if let Some(snake) = backward_step(range, callback, forward, backward, d) {
            return Ok(Some(snake));
        }
    }
    Err(DiffError::NoMiddleSnake {
        old_start: range.old_start,
        old_end: range.old_end,
        new_start: range.new_start,
        new_end: range.new_end,
    })
}

fn forward_step<C>(
    range: &Range,
    callback: &C,
    forward: &mut CenteredArray,
    backward: &CenteredArray,
    d: isize,
) -> Option<MiddleSnake>
where
    C: DiffCallback + ?Sized,
{
    let (old_start, old_end) = (range.old_start as isize, range.old_end as isize);
    let (new_start, new_end) = (range.new_start as isize, range.new_end as isize);
    let delta = range.old_size() as isize - range.new_size() as isize;
    let check = delta.rem_euclid(2) == 1;

    let mut k = -d;
    while k <= d {
        let (start_x, mut x) = if k == -d || (k != d && forward.get(k + 1) > forward.get(k - 1)) {
            let x = forward.get(k + 1);
            (x, x)
        } else {
            let x = forward.get(k - 1);
            (x, x + 1)
        };
        let mut y = new_start + (x - old_start) - k;
        let start_y = if d == 0 || x != start_x { y } else { y - 1 };
        while x < old_end && y < new_end && callback.are_items_the_same(x as usize, y as usize) {
            x += 1;
            y += 1;
        }
        forward.set(k, x);
        if check {
            let backward_k = delta - k;
            if backward_k >= -d + 1 && backward_k <= d - 1 && backward.get(backward_k) <= x {
                return Some(MiddleSnake {
                    start_x,
                    start_y,
                    end_x: x,
                    end_y: y,
                    reverse: false,
                });
            }
        }
        k += 2;
    }
    None
}

fn backward_step<C>(
    range: &Range,
    callback: &C,
    forward: &CenteredArray,
    backward: &mut CenteredArray,
    d: isize,
) -> Option<MiddleSnake>
where
    C: DiffCallback + ?Sized,
{
    let (old_start, old_end) = (range.old_start as isize, range.old_end as isize);
    let (new_start, new_end) = (range.new_start as isize, range.new_end as isize);
    let delta = range.old_size() as isize - range.new_size() as isize;
    let check = delta.rem_euclid(2) == 0;

    let mut k = -d;
    while k <= d {
        let (start_x, mut x) = if k == -d || (k != d && backward.get(k + 1) < backward.get(k - 1)) {
            let x = backward.get(k + 1);
            (x, x)
        } else {
            let x = backward.get(k - 1);
            (x, x - 1)
        };
        let mut y = new_end - ((old_end - x) - k);
        let start_y = if d == 0 || x != start_x { y } else { y + 1 };
        while x > old_start
            && y > new_start
            && callback.are_items_the_same((x - 1) as usize, (y - 1) as usize)
        {
            x -= 1;
            y -= 1;
        }
        backward.set(k, x);
        if check {
            let forward_k = delta - k;
            if forward_k >= -d && forward_k <= d && forward.get(forward_k) >= x {
                return Some(MiddleSnake {
                    start_x: x,
                    start_y: y,
                    end_x: start_x,
                    end_y: start_y,
                    reverse: true,
                });
            }
        }
        k += 2;
    }
    None
}
