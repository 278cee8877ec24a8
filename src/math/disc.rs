//! 圆盘射线求交
//!
//! 实现运动线段与平面圆盘的求交测试，供碰撞力场使用。
//! 该函数是纯函数，不依赖任何模拟状态，可独立进行单元测试。

use glam::Vec3;

/// 法向量长度的最小平方值，低于该值视为退化输入
const DEGENERATE_EPSILON: f32 = 1e-12;

/// 线段与圆盘的求交测试
///
/// 圆盘由原点 `origin`、法向量 `normal` 和半径 `radius` 定义，
/// `radius` 为 0 时视为无限平面（不做半径检查）。
/// 线段由本帧运动的两个端点 `p1` → `p2` 给出。
///
/// 返回交点位置；以下情况返回 `None`：
/// - 线段与平面平行
/// - 穿越参数 t 不在 [0, 1] 范围内
/// - 交点到 `origin` 的距离超过 `radius`（radius > 0 时）
/// - 退化输入（零长度线段、零法向量）
pub fn disc_ray_trace(
    origin: Vec3,
    normal: Vec3,
    radius: f32,
    p1: Vec3,
    p2: Vec3,
) -> Option<Vec3> {
    let direction = p2 - p1;
    if direction.length_squared() < DEGENERATE_EPSILON
        || normal.length_squared() < DEGENERATE_EPSILON
    {
        return None;
    }

    // 线段在法向上的投影长度；为 0 表示与平面平行
    let denom = normal.dot(direction);
    if denom.abs() < DEGENERATE_EPSILON {
        return None;
    }

    let t = normal.dot(origin - p1) / denom;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }

    let point = p1 + direction * t;

    // radius 为 0 表示无限平面
    if radius > 0.0 && point.distance_squared(origin) > radius * radius {
        return None;
    }

    Some(point)
}
