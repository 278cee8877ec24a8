//! 粒子仓模块
//!
//! 基于竞技场（arena）的侵入式双向链表存储。粒子槽位由稳定句柄
//! （索引 + 世代号）索引，槽位内嵌 `prev`/`next` 链接构成存活链表：
//!
//! - O(1) 头部插入：新节点总是成为新的表头
//! - O(1) 按句柄移除：自动缝合相邻链接
//! - 失效句柄解析为 `None`，重复移除是幂等的空操作
//!
//! 移除结果通过 [`RemovedParticle::was_head`] 报告被移除的节点是否是
//! 表头，外部如果缓存了游标需要据此自行修正——仓内部的表头指针
//! 总是自动维护的。
//!
//! 空闲槽位通过空闲链回收复用，持续生灭的发射器不会产生分配抖动。

use crate::particle::Particle;

/// 粒子的稳定句柄
///
/// 槽位被回收复用后世代号递增，旧句柄自动失效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticleHandle {
    index: u32,
    generation: u32,
}

impl ParticleHandle {
    /// 槽位索引（主要用于调试输出）
    pub fn index(&self) -> u32 {
        self.index
    }
}

/// 存活槽位：粒子本体加链表链接
#[derive(Debug)]
struct Node {
    particle: Particle,
    prev: Option<ParticleHandle>,
    next: Option<ParticleHandle>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// 移除操作的结果
#[derive(Debug)]
pub struct RemovedParticle {
    /// 被移除的粒子
    pub particle: Particle,
    /// 被移除的节点是否是表头（外部游标需要修正的情形）
    pub was_head: bool,
}

/// 粒子仓：竞技场存储 + 侵入式存活链表
#[derive(Debug, Default)]
pub struct ParticleArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    head: Option<ParticleHandle>,
    len: usize,
}

impl ParticleArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预留容量，避免首帧发射时的扩容
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            len: 0,
        }
    }

    /// 存活粒子数
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 当前表头句柄
    pub fn head(&self) -> Option<ParticleHandle> {
        self.head
    }

    /// 插入粒子，新节点成为新的表头
    pub fn insert(&mut self, particle: Particle) -> ParticleHandle {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: None,
                });
                (self.slots.len() - 1) as u32
            }
        };

        let handle = ParticleHandle {
            index,
            generation: self.slots[index as usize].generation,
        };

        let old_head = self.head;
        self.slots[index as usize].node = Some(Node {
            particle,
            prev: None,
            next: old_head,
        });

        if let Some(old) = old_head {
            if let Some(node) = self.node_mut(old) {
                node.prev = Some(handle);
            }
        }

        self.head = Some(handle);
        self.len += 1;
        handle
    }

    /// 按句柄移除粒子并缝合相邻链接
    ///
    /// 失效或重复的句柄是幂等空操作，返回 `None`。
    pub fn remove(&mut self, handle: ParticleHandle) -> Option<RemovedParticle> {
        let node = {
            let slot = self.slots.get_mut(handle.index as usize)?;
            if slot.generation != handle.generation {
                return None;
            }
            slot.node.take()?
        };

        if let Some(prev) = node.prev {
            if let Some(prev_node) = self.node_mut(prev) {
                prev_node.next = node.next;
            }
        }
        if let Some(next) = node.next {
            if let Some(next_node) = self.node_mut(next) {
                next_node.prev = node.prev;
            }
        }

        let was_head = self.head == Some(handle);
        if was_head {
            self.head = node.next;
        }

        // 世代号递增使旧句柄失效，槽位回到空闲链
        let slot = &mut self.slots[handle.index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;

        Some(RemovedParticle {
            particle: node.particle,
            was_head,
        })
    }

    /// 句柄是否指向存活粒子
    pub fn contains(&self, handle: ParticleHandle) -> bool {
        self.node(handle).is_some()
    }

    pub fn get(&self, handle: ParticleHandle) -> Option<&Particle> {
        self.node(handle).map(|node| &node.particle)
    }

    pub fn get_mut(&mut self, handle: ParticleHandle) -> Option<&mut Particle> {
        self.node_mut(handle).map(|node| &mut node.particle)
    }

    /// 按链表顺序收集所有存活句柄
    ///
    /// tick 循环里经常需要一边遍历一边销毁粒子，先收集句柄再逐个
    /// 解析可以避免迭代期间的别名问题；失效句柄解析时自然跳过。
    pub fn handles(&self) -> Vec<ParticleHandle> {
        let mut out = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while let Some(handle) = cursor {
            out.push(handle);
            cursor = self.node(handle).and_then(|node| node.next);
        }
        out
    }

    /// 按链表顺序迭代存活粒子
    pub fn iter(&self) -> ArenaIter<'_> {
        ArenaIter {
            arena: self,
            cursor: self.head,
        }
    }

    fn node(&self, handle: ParticleHandle) -> Option<&Node> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn node_mut(&mut self, handle: ParticleHandle) -> Option<&mut Node> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// 校验链表不变量：链接互相一致、无环、可达节点数等于 len
    ///
    /// 测试辅助函数，任何插入/移除序列之后都应返回 true。
    pub fn check_consistency(&self) -> bool {
        let mut reachable = 0usize;
        let mut cursor = self.head;
        let mut prev: Option<ParticleHandle> = None;

        while let Some(handle) = cursor {
            // 可达节点数超过 len 说明成环
            if reachable > self.len {
                return false;
            }
            let node = match self.node(handle) {
                Some(node) => node,
                None => return false,
            };
            if node.prev != prev {
                return false;
            }
            reachable += 1;
            prev = Some(handle);
            cursor = node.next;
        }

        reachable == self.len
    }
}

/// 按链表顺序的借用迭代器
pub struct ArenaIter<'a> {
    arena: &'a ParticleArena,
    cursor: Option<ParticleHandle>,
}

impl<'a> Iterator for ArenaIter<'a> {
    type Item = (ParticleHandle, &'a Particle);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.cursor?;
        let node = self.arena.node(handle)?;
        self.cursor = node.next;
        Some((handle, &node.particle))
    }
}
